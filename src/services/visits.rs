//! Visit aggregation service

use std::collections::HashMap;

use tracing::debug;

use crate::types::{RawServiceRecord, Visit, VisitKey};

/// Visits keyed by (client, date)
pub type VisitMap = HashMap<VisitKey, Visit>;

/// Groups raw service rows into visits
pub struct VisitAggregator;

impl VisitAggregator {
    /// Build the visit map, skipping rows without a client id or service name
    pub fn aggregate(records: &[RawServiceRecord]) -> VisitMap {
        let mut visits: VisitMap = HashMap::new();
        let mut skipped = 0usize;

        for record in records {
            let (Some(client), Some(service)) = (record.client(), record.service()) else {
                skipped += 1;
                continue;
            };

            let key = VisitKey::new(client, record.visit_date);
            visits
                .entry(key.clone())
                .or_insert_with(|| Visit::new(key))
                .add(service, record.price_or_zero());
        }

        if skipped > 0 {
            debug!(skipped, "skipped rows missing client or service");
        }
        debug!(records = records.len(), visits = visits.len(), "aggregated visits");
        visits
    }

    /// Visits sorted by key, for order-independent iteration
    pub fn sorted(visits: &VisitMap) -> Vec<&Visit> {
        let mut sorted: Vec<&Visit> = visits.values().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_record(
        client: Option<&str>,
        day: u32,
        service: Option<&str>,
        price: Option<f64>,
    ) -> RawServiceRecord {
        RawServiceRecord {
            client_id: client.map(String::from),
            visit_date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            service_name: service.map(String::from),
            price,
            location_id: None,
            status: None,
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(VisitAggregator::aggregate(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_groups_by_client_and_date() {
        let records = vec![
            make_record(Some("c1"), 1, Some("Cut"), Some(50.0)),
            make_record(Some("c1"), 1, Some("Color"), Some(120.0)),
            make_record(Some("c1"), 2, Some("Cut"), Some(50.0)),
            make_record(Some("c2"), 1, Some("Manicure"), Some(30.0)),
        ];

        let visits = VisitAggregator::aggregate(&records);
        assert_eq!(visits.len(), 3);

        let key = VisitKey::new("c1", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        let visit = visits.get(&key).unwrap();
        assert_eq!(visit.distinct_services(), 2);
        assert!((visit.ticket_total() - 170.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_skips_malformed_rows() {
        let records = vec![
            make_record(None, 1, Some("Cut"), Some(50.0)),
            make_record(Some("c1"), 1, None, Some(50.0)),
            make_record(Some(""), 1, Some("Cut"), Some(50.0)),
            make_record(Some("c1"), 1, Some("Cut"), None),
        ];

        let visits = VisitAggregator::aggregate(&records);
        assert_eq!(visits.len(), 1);
        let visit = visits.values().next().unwrap();
        assert_eq!(visit.line_items.len(), 1);
        // Missing price counts as 0
        assert_eq!(visit.ticket_total(), 0.0);
    }

    #[test]
    fn test_aggregate_duplicate_service_lines_summed() {
        let records = vec![
            make_record(Some("c1"), 1, Some("Cut"), Some(50.0)),
            make_record(Some("c1"), 1, Some("Cut"), Some(25.0)),
        ];

        let visits = VisitAggregator::aggregate(&records);
        let visit = visits.values().next().unwrap();
        assert_eq!(visit.distinct_services(), 1);
        assert_eq!(visit.line_items.len(), 2);
        assert!((visit.ticket_total() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sorted_orders_by_key() {
        let records = vec![
            make_record(Some("c2"), 1, Some("Cut"), None),
            make_record(Some("c1"), 3, Some("Cut"), None),
            make_record(Some("c1"), 2, Some("Cut"), None),
        ];
        let visits = VisitAggregator::aggregate(&records);
        let sorted = VisitAggregator::sorted(&visits);
        let keys: Vec<_> = sorted
            .iter()
            .map(|v| (v.key.client_id.as_str(), v.key.visit_date.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("c1", "2024-04-02".to_string()),
                ("c1", "2024-04-03".to_string()),
                ("c2", "2024-04-01".to_string()),
            ]
        );
    }
}
