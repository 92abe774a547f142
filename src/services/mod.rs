//! Analytics pipeline services

pub mod classifier;
pub mod config;
pub mod engine;
pub mod fetcher;
pub mod pairing;
pub mod rates;
pub mod request;
pub mod visits;

pub use classifier::{
    CachedClassifier, CategoryClassifier, CategoryRule, ClassifierCache, KeywordClassifier,
    FALLBACK_CATEGORY,
};
pub use config::{AnalyticsConfig, StoreConfig};
pub use engine::PairingAnalyticsEngine;
pub use fetcher::RecordFetcher;
pub use request::{spawn_analysis, AnalyticsOutput, AnalyticsView, Completion, RequestToken, RequestTracker};
pub use visits::{VisitAggregator, VisitMap};
