//! # harvest - Compliance-Gated Content Harvesting for Rust
//!
//! This crate decides whether a page may be fetched at all, fetches it
//! politely if so, and extracts structural writing patterns from it: title
//! shape, heading structure, content density, SEO markers and engagement
//! markers. Collections of pattern records reduce to corpus-level insights.
//!
//! ## Features
//!
//! - Compliance engine with ordered checks and explicit reason codes:
//!   - Blacklist of sites that must never be scraped
//!   - robots.txt rules and crawl delays, cached per domain
//!   - Redirection to official APIs where they exist
//!   - Overridable terms-of-service policy
//! - Per-domain crawl delay enforcement with a bounded wait
//! - HTML sanitizing and readable text extraction
//! - Topic and article discovery from platform listing pages
//! - Pattern extraction over HTML or Markdown with data-driven classifiers
//! - Order-independent insight aggregation
//! - JSON persistence of records and summaries
//!
//! ## Example
//!
//! ```rust,no_run
//! use harvest::compliance::ComplianceConfig;
//! use harvest::crawler::CrawlerConfig;
//! use harvest::harvester::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> harvest::Result<()> {
//!     let mut harvester =
//!         Harvester::new(CrawlerConfig::default(), ComplianceConfig::default())?;
//!
//!     let record = harvester
//!         .harvest("python_docs", "https://docs.python.org/3/tutorial/")
//!         .await?;
//!     println!("{}", record.title_pattern.title_format);
//!     Ok(())
//! }
//! ```

mod error;

pub mod compliance;
pub mod crawler;
pub mod harvester;
pub mod insights;
pub mod patterns;

pub use error::{Error, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::compliance::{
        ComplianceConfig, ComplianceDecision, ComplianceEngine, DecisionReason, DomainPolicy,
    };
    pub use crate::crawler::{CrawlerConfig, Storage};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::harvester::{HarvestError, HarvestReport, Harvester};
    pub use crate::insights::{InsightAggregator, InsightSummary};
    pub use crate::patterns::{Document, PatternExtractor, PatternRecord};
}
