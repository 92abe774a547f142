//! Transaction store trait and implementations

mod export;
mod memory;
mod rest;

pub use export::{ExportStore, DEFAULT_EXPORT_PATTERN};
pub use memory::MemoryStore;
pub use rest::{RestStore, RestStoreConfig};

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{AnalyticsQuery, FetchError, RawServiceRecord};

/// Status excluded from every analytics fetch
pub const CANCELLED_STATUS: &str = "cancelled";

/// One page of a filtered record query
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub query: &'a AnalyticsQuery,
    /// Rows with this status are excluded. Matching is case-insensitive in
    /// every store; rows with no status are kept.
    pub exclude_status: &'a str,
    pub offset: usize,
    pub limit: usize,
}

/// Source of raw per-service transaction rows.
///
/// A store returns fewer than `limit` rows only on the final page. Row order
/// within and across pages is unspecified.
pub trait TransactionStore: Send + Sync {
    /// Store name (e.g., "rest", "export")
    fn name(&self) -> &str;

    /// Fetch a single page of rows matching the request
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<RawServiceRecord>, FetchError>;
}

impl<T: TransactionStore + ?Sized> TransactionStore for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<RawServiceRecord>, FetchError> {
        (**self).fetch_page(request)
    }
}

/// Whether a row satisfies the date, location and status filters of a page request
pub(crate) fn matches_request(record: &RawServiceRecord, request: &PageRequest<'_>) -> bool {
    if !request.query.contains(record.visit_date) {
        return false;
    }
    if let Some(location) = request.query.location_id.as_deref() {
        if record.location_id.as_deref() != Some(location) {
            return false;
        }
    }
    !record.is_status(request.exclude_status)
}

/// Indices of the rows passing one query's filters
#[derive(Debug)]
struct FilterCache {
    query: AnalyticsQuery,
    exclude_status: String,
    indices: Vec<usize>,
}

impl FilterCache {
    fn serves(&self, request: &PageRequest<'_>) -> bool {
        self.query == *request.query && self.exclude_status == request.exclude_status
    }
}

/// Row storage for local stores.
///
/// The rows matching the most recent query are indexed once, so paging
/// through a result set costs one filter pass instead of one per page.
#[derive(Debug, Default)]
pub(crate) struct RowSet {
    rows: Vec<RawServiceRecord>,
    filtered: Mutex<Option<FilterCache>>,
}

impl RowSet {
    pub(crate) fn new(rows: Vec<RawServiceRecord>) -> Self {
        Self {
            rows,
            filtered: Mutex::new(None),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cache(&self) -> MutexGuard<'_, Option<FilterCache>> {
        self.filtered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rows `offset..offset+limit` of those matching `request`
    pub(crate) fn page(&self, request: &PageRequest<'_>) -> Vec<RawServiceRecord> {
        let mut cache = self.cache();
        if !cache.as_ref().is_some_and(|c| c.serves(request)) {
            let indices = self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, r)| matches_request(r, request))
                .map(|(i, _)| i)
                .collect();
            *cache = Some(FilterCache {
                query: request.query.clone(),
                exclude_status: request.exclude_status.to_string(),
                indices,
            });
        }

        cache
            .as_ref()
            .map(|c| {
                c.indices
                    .iter()
                    .skip(request.offset)
                    .take(request.limit)
                    .map(|&i| self.rows[i].clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn row(day: u32, location: Option<&str>, status: Option<&str>) -> RawServiceRecord {
        RawServiceRecord {
            client_id: Some("c1".into()),
            visit_date: date(day),
            service_name: Some("Cut".into()),
            price: Some(40.0),
            location_id: location.map(String::from),
            status: status.map(String::from),
        }
    }

    #[test]
    fn test_matches_request_date_range() {
        let query = AnalyticsQuery::new(date(2), date(4));
        let request = PageRequest {
            query: &query,
            exclude_status: CANCELLED_STATUS,
            offset: 0,
            limit: 10,
        };
        assert!(!matches_request(&row(1, None, None), &request));
        assert!(matches_request(&row(2, None, None), &request));
        assert!(matches_request(&row(4, None, None), &request));
        assert!(!matches_request(&row(5, None, None), &request));
    }

    #[test]
    fn test_matches_request_location_and_status() {
        let query = AnalyticsQuery::new(date(1), date(31)).with_location("downtown");
        let request = PageRequest {
            query: &query,
            exclude_status: CANCELLED_STATUS,
            offset: 0,
            limit: 10,
        };
        assert!(matches_request(&row(3, Some("downtown"), Some("completed")), &request));
        assert!(!matches_request(&row(3, Some("uptown"), None), &request));
        assert!(!matches_request(&row(3, None, None), &request));
        assert!(!matches_request(&row(3, Some("downtown"), Some("CANCELLED")), &request));
    }

    #[test]
    fn test_row_set_page_offsets() {
        let rows = RowSet::new((1..=5).map(|d| row(d, None, None)).collect());
        let query = AnalyticsQuery::new(date(1), date(31));
        let request = PageRequest {
            query: &query,
            exclude_status: CANCELLED_STATUS,
            offset: 3,
            limit: 10,
        };
        let page = rows.page(&request);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].visit_date, date(4));
    }

    #[test]
    fn test_row_set_filters_once_per_query() {
        let mut all: Vec<_> = (1..=10).map(|d| row(d, None, None)).collect();
        all.push(row(11, None, Some("cancelled")));
        let rows = RowSet::new(all);
        let query = AnalyticsQuery::new(date(1), date(31));

        let mut seen = Vec::new();
        for offset in (0..12).step_by(4) {
            let request = PageRequest {
                query: &query,
                exclude_status: CANCELLED_STATUS,
                offset,
                limit: 4,
            };
            seen.extend(rows.page(&request));
            let cache = rows.cache();
            let cached = cache.as_ref().unwrap();
            assert_eq!(cached.query, query);
            assert_eq!(cached.indices.len(), 10);
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_row_set_new_query_replaces_index() {
        let rows = RowSet::new((1..=10).map(|d| row(d, None, None)).collect());
        let wide = AnalyticsQuery::new(date(1), date(31));
        let narrow = AnalyticsQuery::new(date(1), date(3));
        let page = |query: &AnalyticsQuery| {
            rows.page(&PageRequest {
                query,
                exclude_status: CANCELLED_STATUS,
                offset: 0,
                limit: 100,
            })
        };

        assert_eq!(page(&wide).len(), 10);
        assert_eq!(page(&narrow).len(), 3);
        assert_eq!(page(&wide).len(), 10);
    }
}
