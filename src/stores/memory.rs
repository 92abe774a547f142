//! In-memory transaction store

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{PageRequest, RowSet, TransactionStore};
use crate::types::{AnalyticsError, FetchError, RawServiceRecord, Result};

/// Store backed by a `Vec` of rows.
///
/// Used for fixtures and for callers that already hold their rows. Can be told
/// to fail at specific offsets, and counts every page request it serves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RowSet,
    failing_offsets: HashSet<usize>,
    requests: AtomicUsize,
}

impl MemoryStore {
    pub fn new(rows: Vec<RawServiceRecord>) -> Self {
        Self {
            rows: RowSet::new(rows),
            failing_offsets: HashSet::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON array of records
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<RawServiceRecord> =
            serde_json::from_str(json).map_err(|e| AnalyticsError::Parse(e.to_string()))?;
        Ok(Self::new(rows))
    }

    /// Make the page starting at `offset` return a `FetchError`
    pub fn fail_at_offset(mut self, offset: usize) -> Self {
        self.failing_offsets.insert(offset);
        self
    }

    /// Number of page requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TransactionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_page(
        &self,
        request: &PageRequest<'_>,
    ) -> std::result::Result<Vec<RawServiceRecord>, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_offsets.contains(&request.offset) {
            return Err(FetchError::new(request.offset, "injected store failure"));
        }
        Ok(self.rows.page(request))
    }
}
