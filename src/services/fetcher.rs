//! Paginated record fetching

use tracing::{debug, warn};

use crate::stores::{PageRequest, TransactionStore, CANCELLED_STATUS};
use crate::types::{AnalyticsQuery, FetchError, RawServiceRecord};

/// Rows requested per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Pulls every matching row out of a store, one fixed-size page at a time
pub struct RecordFetcher<'a> {
    store: &'a dyn TransactionStore,
    page_size: usize,
    exclude_status: &'a str,
}

impl<'a> RecordFetcher<'a> {
    pub fn new(store: &'a dyn TransactionStore) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
            exclude_status: CANCELLED_STATUS,
        }
    }

    /// Page size (values below 1 are raised to 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_excluded_status(mut self, status: &'a str) -> Self {
        self.exclude_status = status;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch pages until one comes back short, concatenating them.
    ///
    /// Any page failure aborts the whole fetch; rows already received are
    /// discarded.
    pub fn fetch_all(&self, query: &AnalyticsQuery) -> Result<Vec<RawServiceRecord>, FetchError> {
        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            let request = PageRequest {
                query,
                exclude_status: self.exclude_status,
                offset,
                limit: self.page_size,
            };

            let page = self.store.fetch_page(&request).map_err(|e| {
                warn!(store = self.store.name(), offset, error = %e, "page fetch failed");
                e
            })?;

            let rows = page.len();
            debug!(store = self.store.name(), offset, rows, "fetched page");
            records.extend(page);

            if rows < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use chrono::NaiveDate;

    fn query() -> AnalyticsQuery {
        AnalyticsQuery::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    fn rows(n: usize) -> Vec<RawServiceRecord> {
        (0..n)
            .map(|i| RawServiceRecord {
                client_id: Some(format!("client-{}", i)),
                visit_date: NaiveDate::from_ymd_opt(2024, 1, 1 + (i % 28) as u32).unwrap(),
                service_name: Some("Cut".into()),
                price: Some(10.0),
                location_id: None,
                status: None,
            })
            .collect()
    }

    #[test]
    fn test_fetch_all_empty_store_single_request() {
        let store = MemoryStore::new(Vec::new());
        let records = RecordFetcher::new(&store).fetch_all(&query()).unwrap();
        assert!(records.is_empty());
        assert_eq!(store.request_count(), 1);
    }

    #[test]
    fn test_fetch_all_1001_rows_two_pages() {
        let store = MemoryStore::new(rows(1001));
        let records = RecordFetcher::new(&store).fetch_all(&query()).unwrap();

        assert_eq!(records.len(), 1001);
        assert!(store.request_count() >= 2);

        let mut ids: Vec<_> = records.iter().filter_map(|r| r.client_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1001);
    }

    #[test]
    fn test_fetch_all_exact_multiple_needs_trailing_empty_page() {
        let store = MemoryStore::new(rows(20));
        let records = RecordFetcher::new(&store)
            .with_page_size(10)
            .fetch_all(&query())
            .unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(store.request_count(), 3);
    }

    #[test]
    fn test_fetch_all_failure_aborts() {
        let store = MemoryStore::new(rows(25)).fail_at_offset(10);
        let err = RecordFetcher::new(&store)
            .with_page_size(10)
            .fetch_all(&query())
            .unwrap_err();
        assert_eq!(err, FetchError::new(10, "injected store failure"));
        assert_eq!(store.request_count(), 2);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let store = MemoryStore::new(rows(3));
        let fetcher = RecordFetcher::new(&store).with_page_size(0);
        assert_eq!(fetcher.page_size(), 1);
        assert_eq!(fetcher.fetch_all(&query()).unwrap().len(), 3);
    }
}
