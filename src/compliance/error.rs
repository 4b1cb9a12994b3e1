//! Error types for the compliance module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for compliance checks
///
/// A denied URL is not an error; it is reported through
/// [`ComplianceDecision`](super::ComplianceDecision).
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The URL has no host to evaluate
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

impl From<ComplianceError> for CrateError {
    fn from(err: ComplianceError) -> Self {
        CrateError::InvalidUrl(err.to_string())
    }
}
