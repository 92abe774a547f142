//! Query parameters and result rows for pairing analytics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date range (inclusive) and optional location to analyze
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub location_id: Option<String>,
}

impl AnalyticsQuery {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            location_id: None,
        }
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.date_from && date <= self.date_to
    }
}

/// Two services booked in the same visit. `service_a < service_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePairing {
    pub service_a: String,
    pub service_b: String,
    pub count: u64,
    pub pct_of_multi_visits: f64,
}

/// Two categories present in the same visit. `category_a < category_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPairing {
    pub category_a: String,
    pub category_b: String,
    pub count: u64,
    pub pct_of_multi_visits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandaloneRate {
    pub category: String,
    pub total_bookings: u64,
    pub standalone_count: u64,
    pub standalone_rate: f64,
    pub grouped_count: u64,
    pub grouped_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLift {
    pub category: String,
    pub avg_ticket_solo: f64,
    pub avg_ticket_grouped: f64,
    pub lift_dollars: f64,
    pub lift_pct: f64,
}

/// The four result collections of one analytics run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PairingAnalyticsResult {
    pub pairings: Vec<ServicePairing>,
    pub category_pairings: Vec<CategoryPairing>,
    pub standalone_rates: Vec<StandaloneRate>,
    pub revenue_lift: Vec<RevenueLift>,
}

impl PairingAnalyticsResult {
    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
            && self.category_pairings.is_empty()
            && self.standalone_rates.is_empty()
            && self.revenue_lift.is_empty()
    }
}

/// Symmetric category co-occurrence matrix for heatmap rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CategoryHeatmap {
    /// Sorted category labels, indexing both axes
    pub categories: Vec<String>,
    /// `counts[i][j]` visits in which categories i and j co-occur (diagonal is 0)
    pub counts: Vec<Vec<u64>>,
}

impl CategoryHeatmap {
    pub fn from_pairings(pairings: &[CategoryPairing]) -> Self {
        let mut categories: Vec<String> = pairings
            .iter()
            .flat_map(|p| [p.category_a.clone(), p.category_b.clone()])
            .collect();
        categories.sort();
        categories.dedup();

        let n = categories.len();
        let mut counts = vec![vec![0u64; n]; n];
        for p in pairings {
            let (Ok(i), Ok(j)) = (
                categories.binary_search(&p.category_a),
                categories.binary_search(&p.category_b),
            ) else {
                continue;
            };
            counts[i][j] = counts[i][j].saturating_add(p.count);
            counts[j][i] = counts[j][i].saturating_add(p.count);
        }

        Self { categories, counts }
    }

    pub fn get(&self, a: &str, b: &str) -> u64 {
        let idx = |name: &str| self.categories.binary_search_by(|c| c.as_str().cmp(name));
        match (idx(a), idx(b)) {
            (Ok(i), Ok(j)) => self.counts[i][j],
            _ => 0,
        }
    }

    /// Largest cell value (0 when empty)
    pub fn max_count(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }
}
