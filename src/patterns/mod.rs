//! # Patterns Module
//!
//! This module turns one document into a [`PatternRecord`]: the shape of its
//! title, its heading structure, content density, SEO markers and engagement
//! markers.
//!
//! ## Process
//!
//! 1. The document (HTML or Markdown) is reduced to a [`DocumentOutline`]
//! 2. Each sub-analysis reads only the outline and the title
//! 3. Titles and headings are categorized by ordered keyword rules
//!    ([`KeywordClassifier`]); the first matching rule wins
//!
//! Extraction never fails. An empty document yields zero counts and the
//! fallback categories.

mod classify;
mod extractor;
mod outline;

pub use classify::{KeywordClassifier, KeywordRule};
pub use extractor::{DEFAULT_CTA_PHRASES, PatternExtractor};
pub use outline::{Document, DocumentOutline, Heading};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title categories, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleFormat {
    HowTo,
    Listicle,
    Question,
    CaseStudy,
    Trend,
    General,
}

impl TitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HowTo => "how-to",
            Self::Listicle => "listicle",
            Self::Question => "question",
            Self::CaseStudy => "case-study",
            Self::Trend => "trend",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section categories, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Introduction,
    Conclusion,
    Problem,
    Solution,
    Example,
    Content,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::Conclusion => "conclusion",
            Self::Problem => "problem",
            Self::Solution => "solution",
            Self::Example => "example",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A word and how often it occurs in a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub word: String,
    pub count: usize,
}

/// Shape of a document's title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitlePattern {
    /// Title length in characters
    pub title_length: usize,

    /// Length of the first level-1 heading in characters, 0 without one
    pub h1_length: usize,

    pub word_count: usize,
    pub has_numbers: bool,
    pub has_colon: bool,
    pub has_dash: bool,
    pub title_format: TitleFormat,

    /// Up to five words longer than three characters, most frequent first
    pub common_words: Vec<WordFrequency>,
}

/// Heading structure of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStructure {
    pub total_headings: usize,

    /// Heading tags in document order ("h1", "h2", ...)
    pub heading_hierarchy: Vec<String>,

    /// The category of every heading in document order
    pub section_types: Vec<SectionType>,

    pub has_introduction: bool,
    pub has_conclusion: bool,

    /// Headings per distinct section type
    pub avg_section_length: f64,
}

/// Body content signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPatterns {
    pub paragraph_count: usize,

    /// Mean words per paragraph
    pub avg_paragraph_length: f64,

    /// Number of list items
    pub list_count: usize,

    pub code_block_count: usize,
    pub image_count: usize,
    pub word_count: usize,
    pub has_call_to_action: bool,

    /// Words per paragraph over the whole document
    pub content_density: f64,
}

/// Search engine markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoPatterns {
    pub has_meta_description: bool,

    /// Meta description length in characters, 0 without one
    pub meta_description_length: usize,

    pub has_meta_keywords: bool,
    pub has_canonical: bool,

    /// Heading count per level, only levels that occur
    pub heading_structure: BTreeMap<String, usize>,
}

/// Social sharing and comment markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub has_social_sharing: bool,
    pub has_comments: bool,
    pub has_call_to_action: bool,
    pub social_button_count: usize,
    pub comment_section_count: usize,
}

/// The structured extraction of one document
///
/// Records are created once by the [`PatternExtractor`] and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    /// Platform label supplied by the caller
    pub platform: String,

    pub url: String,
    pub title_pattern: TitlePattern,
    pub section_structure: SectionStructure,
    pub content_patterns: ContentPatterns,
    pub seo_patterns: SeoPatterns,
    pub engagement_metrics: EngagementMetrics,
    pub scraped_at: DateTime<Utc>,
}
