//! Error types for the harvest crate

use thiserror::Error;

/// Result type for harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for harvest operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The URL could not be parsed or has no host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The compliance engine refused the URL
    #[error("Policy denied {url}: {reason}")]
    PolicyDenied {
        /// The URL that was refused
        url: String,
        /// The reason code reported by the engine
        reason: String,
    },

    /// Fetching a page failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// There were no pattern records to summarize
    #[error("No pattern records to summarize")]
    EmptyCorpus,

    /// Persisting results failed
    #[error("Storage error: {0}")]
    Storage(String),
}
