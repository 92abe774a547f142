//! Standalone/grouped booking rates and revenue lift per category

use std::collections::HashMap;

use crate::services::classifier::{visit_categories, CategoryClassifier};
use crate::services::pairing::percent;
use crate::services::visits::{VisitAggregator, VisitMap};
use crate::types::{RevenueLift, StandaloneRate};

/// Categories with fewer bookings are left out of the rate table
pub const DEFAULT_MIN_RATE_BOOKINGS: u64 = 3;

/// Both ticket samples need at least this many visits for a lift row
pub const DEFAULT_MIN_LIFT_SAMPLES: usize = 2;

/// Per-category tallies across all visits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    pub standalone: u64,
    pub grouped: u64,
    pub solo_tickets: Vec<f64>,
    pub grouped_tickets: Vec<f64>,
}

impl CategoryTally {
    pub fn total_bookings(&self) -> u64 {
        self.standalone + self.grouped
    }

    fn record(&mut self, is_multi: bool, ticket: f64) {
        if is_multi {
            self.grouped += 1;
            self.grouped_tickets.push(ticket);
        } else {
            self.standalone += 1;
            self.solo_tickets.push(ticket);
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateAnalysis {
    pub standalone_rates: Vec<StandaloneRate>,
    pub revenue_lift: Vec<RevenueLift>,
}

/// Computes how often each category is booked alone versus with other
/// services, and how much bundling raises the average ticket.
pub struct RateCalculator<'a> {
    classifier: &'a dyn CategoryClassifier,
    min_rate_bookings: u64,
    min_lift_samples: usize,
}

impl<'a> RateCalculator<'a> {
    pub fn new(classifier: &'a dyn CategoryClassifier) -> Self {
        Self {
            classifier,
            min_rate_bookings: DEFAULT_MIN_RATE_BOOKINGS,
            min_lift_samples: DEFAULT_MIN_LIFT_SAMPLES,
        }
    }

    pub fn with_thresholds(mut self, min_rate_bookings: u64, min_lift_samples: usize) -> Self {
        self.min_rate_bookings = min_rate_bookings;
        self.min_lift_samples = min_lift_samples;
        self
    }

    /// Tally every visit against every category it touches.
    ///
    /// A multi-service visit counts as grouped for each of its categories, even
    /// when all of its services fall in one category.
    pub fn tally(&self, visits: &VisitMap) -> HashMap<String, CategoryTally> {
        let mut tallies: HashMap<String, CategoryTally> = HashMap::new();

        // Key order keeps ticket sample order, and so float sums, stable across runs
        for visit in VisitAggregator::sorted(visits) {
            let is_multi = visit.is_multi_service();
            let ticket = visit.ticket_total();
            for category in visit_categories(visit, self.classifier) {
                tallies.entry(category).or_default().record(is_multi, ticket);
            }
        }

        tallies
    }

    pub fn analyze(&self, visits: &VisitMap) -> RateAnalysis {
        let tallies = self.tally(visits);
        RateAnalysis {
            standalone_rates: self.standalone_rates(&tallies),
            revenue_lift: self.revenue_lift(&tallies),
        }
    }

    /// Rate rows sorted by standalone rate descending (ties by category)
    pub fn standalone_rates(&self, tallies: &HashMap<String, CategoryTally>) -> Vec<StandaloneRate> {
        let mut rates: Vec<StandaloneRate> = tallies
            .iter()
            .filter(|(_, t)| t.total_bookings() >= self.min_rate_bookings)
            .map(|(category, t)| {
                let total = t.total_bookings();
                let (standalone_rate, grouped_rate) = if total == 0 {
                    (0.0, 0.0)
                } else {
                    let standalone_rate = percent(t.standalone as f64, total as f64);
                    (standalone_rate, 100.0 - standalone_rate)
                };
                StandaloneRate {
                    category: category.clone(),
                    total_bookings: total,
                    standalone_count: t.standalone,
                    standalone_rate,
                    grouped_count: t.grouped,
                    grouped_rate,
                }
            })
            .collect();

        rates.sort_by(|a, b| {
            b.standalone_rate
                .total_cmp(&a.standalone_rate)
                .then_with(|| a.category.cmp(&b.category))
        });
        rates
    }

    /// Lift rows sorted by lift dollars descending (ties by category)
    pub fn revenue_lift(&self, tallies: &HashMap<String, CategoryTally>) -> Vec<RevenueLift> {
        let mut lifts: Vec<RevenueLift> = tallies
            .iter()
            .filter(|(_, t)| {
                t.solo_tickets.len() >= self.min_lift_samples
                    && t.grouped_tickets.len() >= self.min_lift_samples
            })
            .map(|(category, t)| {
                let avg_ticket_solo = mean(&t.solo_tickets);
                let avg_ticket_grouped = mean(&t.grouped_tickets);
                let lift_dollars = avg_ticket_grouped - avg_ticket_solo;
                RevenueLift {
                    category: category.clone(),
                    avg_ticket_solo,
                    avg_ticket_grouped,
                    lift_dollars,
                    lift_pct: percent(lift_dollars, avg_ticket_solo),
                }
            })
            .collect();

        lifts.sort_by(|a, b| {
            b.lift_dollars
                .total_cmp(&a.lift_dollars)
                .then_with(|| a.category.cmp(&b.category))
        });
        lifts
    }
}
