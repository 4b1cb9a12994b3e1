//! Page fetching module
//!
//! This module fetches pages the compliance engine has allowed, spaces
//! requests to each domain by its crawl delay, reduces HTML to sanitized
//! markup and readable text, finds topic and article links on listing
//! pages, and persists harvest results as JSON.

mod config;
mod content_extraction;
mod discovery;
mod error;
mod fetcher;
mod rate_gate;
pub mod storage;

pub use config::{CrawlerConfig, CrawlerConfigBuilder, default_user_agent};
pub use content_extraction::{
    NON_CONTENT_TAGS, clean_html, extract_metadata, normalize_whitespace, visible_text,
};
pub use discovery::{ARTICLE_INDICATORS, LinkKind, TOPIC_INDICATORS, extract_links};
pub use error::FetchError;
pub use fetcher::ContentFetcher;
pub use rate_gate::RateGate;
pub use storage::{Storage, StorageConfig, StorageError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetched page reduced to the parts the extractor needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// The page markup with script, style and noscript subtrees removed
    pub html: String,

    /// Readable text in document order with whitespace collapsed
    pub text: String,

    /// Metadata extracted from the page head
    pub metadata: PageMetadata,

    /// Whether results derived from the page must credit the source
    pub attribution_required: bool,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Metadata for a fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Title of the page
    pub title: Option<String>,

    /// Meta description of the page
    pub description: Option<String>,

    /// Canonical URL declared by the page
    pub canonical: Option<String>,

    /// Author of the page
    pub author: Option<String>,

    /// Domain of the page
    pub domain: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_metadata() {
        let metadata = PageMetadata {
            title: Some("Test Page".to_string()),
            description: Some("Test description".to_string()),
            canonical: None,
            author: Some("Test Author".to_string()),
            domain: "example.com".to_string(),
        };

        assert_eq!(metadata.title.as_deref().unwrap(), "Test Page");
        assert_eq!(metadata.description.as_deref().unwrap(), "Test description");
        assert_eq!(metadata.author.as_deref().unwrap(), "Test Author");
        assert_eq!(metadata.domain, "example.com");

        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json["canonical"].is_null());
    }
}
