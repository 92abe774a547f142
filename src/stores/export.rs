//! JSONL export directory store

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::{PageRequest, RowSet, TransactionStore};
use crate::types::{FetchError, RawServiceRecord, Result};

/// Default glob pattern for export files
pub const DEFAULT_EXPORT_PATTERN: &str = "**/*.jsonl";

/// Store over a directory of JSONL transaction exports.
///
/// Every file matching the glob pattern is parsed once at open time (in
/// parallel); pages are then served from memory with the same filters a
/// remote store applies.
pub struct ExportStore {
    data_dir: PathBuf,
    pattern: String,
    rows: RowSet,
}

impl ExportStore {
    /// Load all exports under `data_dir` matching `pattern`.
    /// A missing directory yields an empty store.
    pub fn open(data_dir: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let mut store = Self {
            data_dir: data_dir.into(),
            pattern: pattern.to_string(),
            rows: RowSet::default(),
        };
        let files = store.collect_files();
        store.rows = RowSet::new(Self::parse_files(&files));
        debug!(
            files = files.len(),
            rows = store.rows.len(),
            dir = %store.data_dir.display(),
            "loaded transaction exports"
        );
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Collect all files matching the glob pattern (sorted by glob)
    fn collect_files(&self) -> Vec<PathBuf> {
        let pattern = self.data_dir.join(&self.pattern);
        glob::glob(&pattern.to_string_lossy())
            .map(|paths| paths.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect())
            .unwrap_or_default()
    }

    /// Parse files in parallel, keeping file order in the output
    fn parse_files(files: &[PathBuf]) -> Vec<RawServiceRecord> {
        files
            .par_iter()
            .map(|f| match Self::parse_file(f) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(file = %f.display(), error = %e, "failed to read export");
                    Vec::new()
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn parse_file(path: &Path) -> Result<Vec<RawServiceRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            let mut bytes = line.into_bytes();
            if bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match Self::parse_line(&mut bytes) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(file = %path.display(), skipped, "skipped unparseable export lines");
        }
        Ok(rows)
    }

    fn parse_line(line: &mut [u8]) -> Option<RawServiceRecord> {
        simd_json::from_slice(line).ok()
    }
}

impl TransactionStore for ExportStore {
    fn name(&self) -> &str {
        "export"
    }

    fn fetch_page(
        &self,
        request: &PageRequest<'_>,
    ) -> std::result::Result<Vec<RawServiceRecord>, FetchError> {
        Ok(self.rows.page(request))
    }
}
