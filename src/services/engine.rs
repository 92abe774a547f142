//! Pairing analytics pipeline: fetch, aggregate, analyze

use chrono::NaiveDate;
use tracing::info;

use crate::services::classifier::CategoryClassifier;
use crate::services::config::AnalyticsConfig;
use crate::services::fetcher::RecordFetcher;
use crate::services::pairing::PairingAnalyzer;
use crate::services::rates::RateCalculator;
use crate::services::request::AnalyticsView;
use crate::services::visits::VisitAggregator;
use crate::stores::TransactionStore;
use crate::types::{AnalyticsQuery, FetchError, PairingAnalyticsResult, RawServiceRecord};

/// Runs the full analytics pipeline against a store.
///
/// Holds no state between calls; each computation builds its own record set
/// and visit map.
pub struct PairingAnalyticsEngine<'a> {
    store: &'a dyn TransactionStore,
    classifier: &'a dyn CategoryClassifier,
    config: AnalyticsConfig,
}

impl<'a> PairingAnalyticsEngine<'a> {
    pub fn new(store: &'a dyn TransactionStore, classifier: &'a dyn CategoryClassifier) -> Self {
        Self {
            store,
            classifier,
            config: AnalyticsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Analyze all non-cancelled services between `date_from` and `date_to`
    /// (inclusive), optionally restricted to one location.
    pub fn compute_pairing_analytics(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        location_id: Option<&str>,
    ) -> Result<PairingAnalyticsResult, FetchError> {
        let mut query = AnalyticsQuery::new(date_from, date_to);
        query.location_id = location_id.map(String::from);
        self.compute(&query)
    }

    pub fn compute(&self, query: &AnalyticsQuery) -> Result<PairingAnalyticsResult, FetchError> {
        let records = RecordFetcher::new(self.store)
            .with_page_size(self.config.page_size)
            .with_excluded_status(&self.config.excluded_status)
            .fetch_all(query)?;

        let result = self.analyze_records(&records);
        info!(
            from = %query.date_from,
            to = %query.date_to,
            location = query.location_id.as_deref().unwrap_or("all"),
            records = records.len(),
            pairings = result.pairings.len(),
            categories = result.standalone_rates.len(),
            "computed pairing analytics"
        );
        Ok(result)
    }

    /// Compute and publish into `view` under a fresh request token.
    /// Returns false if a newer request was issued meanwhile.
    pub fn compute_into(&self, view: &AnalyticsView, query: &AnalyticsQuery) -> bool {
        let token = view.begin();
        view.complete(token, self.compute(query))
    }

    /// Pure part of the pipeline, over an already fetched record set
    pub fn analyze_records(&self, records: &[RawServiceRecord]) -> PairingAnalyticsResult {
        let visits = VisitAggregator::aggregate(records);

        let pairing = PairingAnalyzer::new(self.classifier)
            .with_top_n(self.config.top_pairings)
            .analyze(&visits);
        let rates = RateCalculator::new(self.classifier)
            .with_thresholds(self.config.min_rate_bookings, self.config.min_lift_samples)
            .analyze(&visits);

        PairingAnalyticsResult {
            pairings: pairing.pairings,
            category_pairings: pairing.category_pairings,
            standalone_rates: rates.standalone_rates,
            revenue_lift: rates.revenue_lift,
        }
    }
}
