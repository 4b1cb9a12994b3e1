//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The server redirected to another URL, which was not followed
    #[error("{url} redirects to {location}")]
    Redirect {
        /// The requested URL
        url: String,
        /// The absolute redirect target
        location: String,
    },

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            FetchError::UrlParse(e) => CrateError::InvalidUrl(e.to_string()),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
