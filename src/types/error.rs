use thiserror::Error;

/// A transaction store failed to return a page.
///
/// Fatal for the computation that issued it. The engine hands it back to the
/// caller exactly as the store produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch error at offset {offset}: {message}")]
pub struct FetchError {
    /// Row offset of the page that failed
    pub offset: usize,
    /// Store-provided failure description
    pub message: String,
}

impl FetchError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// visitlift error types
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Store page request failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON/JSONL
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for visitlift
pub type Result<T> = std::result::Result<T, AnalyticsError>;
