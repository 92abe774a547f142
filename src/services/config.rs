//! Analytics configuration (~/.visitlift/config.json)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::services::classifier::{CategoryRule, KeywordClassifier};
use crate::services::fetcher::DEFAULT_PAGE_SIZE;
use crate::services::pairing::DEFAULT_TOP_PAIRINGS;
use crate::services::rates::{DEFAULT_MIN_LIFT_SAMPLES, DEFAULT_MIN_RATE_BOOKINGS};
use crate::stores::{
    ExportStore, RestStore, RestStoreConfig, TransactionStore, CANCELLED_STATUS,
    DEFAULT_EXPORT_PATTERN,
};
use crate::types::{AnalyticsError, Result};

fn default_export_pattern() -> String {
    DEFAULT_EXPORT_PATTERN.to_string()
}

/// Where transaction rows come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Rest(RestStoreConfig),
    Export {
        dir: PathBuf,
        #[serde(default = "default_export_pattern")]
        pattern: String,
    },
}

impl StoreConfig {
    pub fn open(&self) -> Result<Box<dyn TransactionStore>> {
        match self {
            Self::Rest(config) => Ok(Box::new(RestStore::new(config.clone())?)),
            Self::Export { dir, pattern } => Ok(Box::new(ExportStore::open(dir, pattern)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Rows per store request
    pub page_size: usize,
    /// Service pairings reported
    pub top_pairings: usize,
    /// Minimum bookings for a standalone-rate row
    pub min_rate_bookings: u64,
    /// Minimum solo and grouped tickets for a lift row
    pub min_lift_samples: usize,
    /// Transaction status excluded from every fetch
    pub excluded_status: String,
    /// Replaces the built-in classifier rules when set
    pub categories: Option<Vec<CategoryRule>>,
    pub store: Option<StoreConfig>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            top_pairings: DEFAULT_TOP_PAIRINGS,
            min_rate_bookings: DEFAULT_MIN_RATE_BOOKINGS,
            min_lift_samples: DEFAULT_MIN_LIFT_SAMPLES,
            excluded_status: CANCELLED_STATUS.to_string(),
            categories: None,
            store: None,
        }
    }
}

impl AnalyticsConfig {
    /// Load from the default path; a missing file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            AnalyticsError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// ~/.visitlift/config.json
    pub fn default_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| AnalyticsError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".visitlift").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AnalyticsError::Config("page_size must be > 0".into()));
        }
        if self.excluded_status.trim().is_empty() {
            return Err(AnalyticsError::Config("excluded_status must not be empty".into()));
        }
        Ok(())
    }

    /// Glob pattern for an export directory given on the command line:
    /// the configured export pattern, or the default one
    pub fn export_pattern(&self) -> &str {
        match &self.store {
            Some(StoreConfig::Export { pattern, .. }) => pattern,
            _ => DEFAULT_EXPORT_PATTERN,
        }
    }

    /// REST settings for a base URL given on the command line, keeping the
    /// configured table, ordering and key variable when a REST store is set
    pub fn rest_store_for(&self, base_url: &str) -> RestStoreConfig {
        match &self.store {
            Some(StoreConfig::Rest(rest)) => RestStoreConfig {
                base_url: base_url.to_string(),
                ..rest.clone()
            },
            _ => RestStoreConfig::new(base_url),
        }
    }

    /// Keyword classifier from configured rules, or the built-in rules
    pub fn classifier(&self) -> Result<KeywordClassifier> {
        match &self.categories {
            Some(rules) => KeywordClassifier::new(rules),
            None => Ok(KeywordClassifier::default()),
        }
    }
}
