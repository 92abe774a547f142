//! Service and category co-occurrence analysis

use std::collections::HashMap;

use crate::services::classifier::{visit_categories, CategoryClassifier};
use crate::services::visits::VisitMap;
use crate::types::{CategoryPairing, ServicePairing};

/// Service pairings emitted per run
pub const DEFAULT_TOP_PAIRINGS: usize = 10;

/// `part / whole * 100`, or 0 when `whole` is 0
pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Every `(items[i], items[j])` with `i < j`.
///
/// With sorted, distinct input the first element of each pair is always the
/// lexicographically smaller one.
pub(crate) fn unordered_pairs<'a>(items: &'a [&'a str]) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| items[i + 1..].iter().map(move |b| (*a, *b)))
}

type PairCounts = HashMap<(String, String), u64>;

/// Output of one pairing pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairingAnalysis {
    /// Top service pairings, count descending
    pub pairings: Vec<ServicePairing>,
    /// All category pairings, count descending
    pub category_pairings: Vec<CategoryPairing>,
    /// Visits with two or more distinct services
    pub multi_service_visits: u64,
    /// Total increments applied to service-pair counters
    pub service_pair_increments: u64,
}

/// Counts which services and categories are booked together
pub struct PairingAnalyzer<'a> {
    classifier: &'a dyn CategoryClassifier,
    top_n: usize,
}

impl<'a> PairingAnalyzer<'a> {
    pub fn new(classifier: &'a dyn CategoryClassifier) -> Self {
        Self {
            classifier,
            top_n: DEFAULT_TOP_PAIRINGS,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn analyze(&self, visits: &VisitMap) -> PairingAnalysis {
        let mut service_counts: PairCounts = HashMap::new();
        let mut category_counts: PairCounts = HashMap::new();
        let mut multi_service_visits = 0u64;
        let mut service_pair_increments = 0u64;

        for visit in visits.values().filter(|v| v.is_multi_service()) {
            multi_service_visits += 1;

            // BTreeSet iteration is already sorted
            let services: Vec<&str> = visit.services.iter().map(String::as_str).collect();
            for (a, b) in unordered_pairs(&services) {
                *service_counts
                    .entry((a.to_string(), b.to_string()))
                    .or_default() += 1;
                service_pair_increments += 1;
            }

            let categories = visit_categories(visit, self.classifier);
            let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
            for (a, b) in unordered_pairs(&categories) {
                *category_counts
                    .entry((a.to_string(), b.to_string()))
                    .or_default() += 1;
            }
        }

        let total = multi_service_visits as f64;

        let mut pairings: Vec<ServicePairing> = ranked(service_counts)
            .into_iter()
            .map(|((service_a, service_b), count)| ServicePairing {
                service_a,
                service_b,
                count,
                pct_of_multi_visits: percent(count as f64, total),
            })
            .collect();
        pairings.truncate(self.top_n);

        let category_pairings = ranked(category_counts)
            .into_iter()
            .map(|((category_a, category_b), count)| CategoryPairing {
                category_a,
                category_b,
                count,
                pct_of_multi_visits: percent(count as f64, total),
            })
            .collect();

        PairingAnalysis {
            pairings,
            category_pairings,
            multi_service_visits,
            service_pair_increments,
        }
    }
}

/// Count descending, then names ascending
fn ranked(counts: PairCounts) -> Vec<((String, String), u64)> {
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_by(|(ka, ca), (kb, cb)| cb.cmp(ca).then_with(|| ka.cmp(kb)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::KeywordClassifier;
    use crate::services::visits::VisitAggregator;
    use crate::types::RawServiceRecord;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn row(client: &str, day: u32, service: &str) -> RawServiceRecord {
        RawServiceRecord {
            client_id: Some(client.to_string()),
            visit_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            service_name: Some(service.to_string()),
            price: Some(10.0),
            location_id: None,
            status: None,
        }
    }

    /// First word of the service name is its category
    fn prefix_classifier(name: &str) -> String {
        name.split_whitespace().next().unwrap_or("Other").to_string()
    }

    fn analyze(records: &[RawServiceRecord]) -> PairingAnalysis {
        let visits = VisitAggregator::aggregate(records);
        PairingAnalyzer::new(&prefix_classifier).analyze(&visits)
    }

    // ========== helper tests ==========

    #[test]
    fn test_percent_zero_denominator() {
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert!((percent(1.0, 4.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_unordered_pairs() {
        let items = ["a", "b", "c"];
        let pairs: Vec<_> = unordered_pairs(&items).collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "c"), ("b", "c")]);
        assert_eq!(unordered_pairs(&items[..1]).count(), 0);
    }

    // ========== analyze() tests ==========

    #[test]
    fn test_analyze_empty() {
        let result = analyze(&[]);
        assert!(result.pairings.is_empty());
        assert!(result.category_pairings.is_empty());
        assert_eq!(result.multi_service_visits, 0);
    }

    #[test]
    fn test_single_service_visits_ignored() {
        let result = analyze(&[row("c1", 1, "Hair Cut"), row("c2", 1, "Hair Cut")]);
        assert!(result.pairings.is_empty());
        assert_eq!(result.multi_service_visits, 0);
    }

    #[test]
    fn test_pairs_are_canonical() {
        let result = analyze(&[
            row("c1", 1, "Nails Manicure"),
            row("c1", 1, "Hair Cut"),
            row("c2", 1, "Hair Cut"),
            row("c2", 1, "Nails Manicure"),
        ]);

        assert_eq!(result.pairings.len(), 1);
        let p = &result.pairings[0];
        assert_eq!(p.service_a, "Hair Cut");
        assert_eq!(p.service_b, "Nails Manicure");
        assert_eq!(p.count, 2);
        assert!((p.pct_of_multi_visits - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_services_one_category_no_category_pairs() {
        let result = analyze(&[
            row("c1", 1, "Hair Cut"),
            row("c1", 1, "Hair Blowout"),
            row("c1", 1, "Hair Gloss"),
        ]);
        assert_eq!(result.pairings.len(), 3);
        assert_eq!(result.service_pair_increments, 3);
        assert!(result.category_pairings.is_empty());
    }

    #[test]
    fn test_category_pairings_sorted_and_uncapped() {
        let mut records = Vec::new();
        // c1: Hair+Nails+Skin, c2: Hair+Nails, c3: Hair+Nails
        for s in ["Hair Cut", "Nails Mani", "Skin Facial"] {
            records.push(row("c1", 1, s));
        }
        for c in ["c2", "c3"] {
            records.push(row(c, 1, "Hair Cut"));
            records.push(row(c, 1, "Nails Mani"));
        }

        let result = analyze(&records);
        assert_eq!(result.multi_service_visits, 3);
        assert_eq!(result.category_pairings.len(), 3);

        let first = &result.category_pairings[0];
        assert_eq!((first.category_a.as_str(), first.category_b.as_str()), ("Hair", "Nails"));
        assert_eq!(first.count, 3);
        assert!((first.pct_of_multi_visits - 100.0).abs() < 1e-9);

        // Ties broken by name
        assert_eq!(result.category_pairings[1].category_a, "Hair");
        assert_eq!(result.category_pairings[1].category_b, "Skin");
        assert_eq!(result.category_pairings[2].category_a, "Nails");
        assert!((result.category_pairings[2].pct_of_multi_visits - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_cap() {
        // One visit with 6 services gives 15 pairs
        let records: Vec<_> = (0..6).map(|i| row("c1", 1, &format!("S{}", i))).collect();
        let visits = VisitAggregator::aggregate(&records);

        let result = PairingAnalyzer::new(&prefix_classifier).analyze(&visits);
        assert_eq!(result.pairings.len(), DEFAULT_TOP_PAIRINGS);
        assert_eq!(result.service_pair_increments, 15);

        let result = PairingAnalyzer::new(&prefix_classifier)
            .with_top_n(3)
            .analyze(&visits);
        assert_eq!(result.pairings.len(), 3);
        assert_eq!(result.pairings[0].service_a, "S0");
        assert_eq!(result.pairings[0].service_b, "S1");
    }

    #[test]
    fn test_duplicate_lines_do_not_create_self_pairs() {
        let result = analyze(&[
            row("c1", 1, "Hair Cut"),
            row("c1", 1, "Hair Cut"),
            row("c1", 1, "Nails Mani"),
        ]);
        assert_eq!(result.pairings.len(), 1);
        assert_eq!(result.pairings[0].count, 1);
    }

    #[test]
    fn test_with_keyword_classifier() {
        let records = vec![
            row("c1", 1, "Women's Haircut"),
            row("c1", 1, "Gel Manicure"),
        ];
        let visits = VisitAggregator::aggregate(&records);
        let classifier = KeywordClassifier::default();
        let result = PairingAnalyzer::new(&classifier).analyze(&visits);

        assert_eq!(result.category_pairings.len(), 1);
        assert_eq!(result.category_pairings[0].category_a, "Hair");
        assert_eq!(result.category_pairings[0].category_b, "Nails");
    }

    proptest! {
        /// Property: a visit with k distinct services adds exactly k*(k-1)/2 pair increments.
        #[test]
        fn pair_increments_are_k_choose_2(k in 0usize..30, dupes in 0usize..5) {
            let mut records: Vec<_> = (0..k).map(|i| row("c1", 1, &format!("Svc {:02}", i))).collect();
            for i in 0..dupes.min(k) {
                records.push(row("c1", 1, &format!("Svc {:02}", i)));
            }
            let result = analyze(&records);

            let expected = if k >= 2 { (k * (k - 1) / 2) as u64 } else { 0 };
            prop_assert_eq!(result.service_pair_increments, expected);
        }

        /// Property: no pairing is emitted in both orders, and a < b always holds.
        #[test]
        fn pairings_never_swapped(
            visits in prop::collection::vec(prop::collection::vec(0u8..6, 1..6), 1..20)
        ) {
            let mut records = Vec::new();
            for (v, services) in visits.iter().enumerate() {
                for s in services {
                    records.push(row(&format!("c{}", v), 1, &format!("S{}", s)));
                }
            }
            let visits = VisitAggregator::aggregate(&records);
            let result = PairingAnalyzer::new(&prefix_classifier).with_top_n(usize::MAX).analyze(&visits);

            for p in &result.pairings {
                prop_assert!(p.service_a < p.service_b);
                prop_assert!(!result.pairings.iter().any(|q| q.service_a == p.service_b && q.service_b == p.service_a));
            }
        }
    }
}
