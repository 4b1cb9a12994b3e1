//! Pattern extraction from document outlines

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::patterns::{
    ContentPatterns, Document, DocumentOutline, EngagementMetrics, KeywordClassifier,
    PatternRecord, SectionStructure, SectionType, SeoPatterns, TitleFormat, TitlePattern,
    WordFrequency,
};

/// Phrases that mark a call to action
pub const DEFAULT_CTA_PHRASES: [&str; 13] = [
    "subscribe",
    "download",
    "sign up",
    "get started",
    "learn more",
    "read more",
    "click here",
    "try now",
    "join us",
    "contact us",
    "follow me",
    "share",
    "comment",
];

/// Words a title word must be longer than to count as common
const MIN_COMMON_WORD_LEN: usize = 3;

/// How many common words a title pattern keeps
const COMMON_WORD_LIMIT: usize = 5;

/// Extracts pattern records from documents
///
/// Extraction is a pure function of the document, the title and the
/// timestamp, so the same inputs always give the same record.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    titles: KeywordClassifier<TitleFormat>,
    sections: KeywordClassifier<SectionType>,
    cta_phrases: Vec<String>,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new(
            KeywordClassifier::title_formats(),
            KeywordClassifier::section_types(),
        )
    }
}

impl PatternExtractor {
    /// Create an extractor with custom classifiers and the default CTA phrases
    pub fn new(
        titles: KeywordClassifier<TitleFormat>,
        sections: KeywordClassifier<SectionType>,
    ) -> Self {
        Self {
            titles,
            sections,
            cta_phrases: DEFAULT_CTA_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Replace the call-to-action phrases
    pub fn with_cta_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cta_phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn title_classifier(&self) -> &KeywordClassifier<TitleFormat> {
        &self.titles
    }

    pub fn section_classifier(&self) -> &KeywordClassifier<SectionType> {
        &self.sections
    }

    /// Extract a pattern record stamped with the current time
    pub fn extract(
        &self,
        platform: &str,
        url: &str,
        title: &str,
        document: &Document,
    ) -> PatternRecord {
        self.extract_at(platform, url, title, document, Utc::now())
    }

    /// Extract a pattern record with an explicit timestamp
    ///
    /// # Arguments
    ///
    /// * `platform` - Label of the platform the document came from
    /// * `url` - Where the document came from
    /// * `title` - The document title; for HTML an empty title falls back to `<title>`
    /// * `document` - The HTML or Markdown document
    /// * `scraped_at` - Timestamp stored in the record
    ///
    /// # Returns
    ///
    /// The pattern record
    #[instrument(skip(self, title, document, scraped_at))]
    pub fn extract_at(
        &self,
        platform: &str,
        url: &str,
        title: &str,
        document: &Document,
        scraped_at: DateTime<Utc>,
    ) -> PatternRecord {
        let outline = document.outline();
        let title = match (title.trim().is_empty(), &outline.page_title) {
            (true, Some(page_title)) => page_title.as_str(),
            _ => title,
        };

        let content_patterns = self.content_patterns(&outline);
        let engagement_metrics = EngagementMetrics {
            has_social_sharing: outline.social_markers > 0,
            has_comments: outline.comment_markers > 0,
            has_call_to_action: content_patterns.has_call_to_action,
            social_button_count: outline.social_markers,
            comment_section_count: outline.comment_markers,
        };

        let record = PatternRecord {
            platform: platform.to_string(),
            url: url.to_string(),
            title_pattern: self.title_pattern(title, &outline),
            section_structure: self.section_structure(&outline),
            content_patterns,
            seo_patterns: seo_patterns(&outline),
            engagement_metrics,
            scraped_at,
        };

        debug!(
            "Extracted {} title with {} headings",
            record.title_pattern.title_format, record.section_structure.total_headings
        );
        record
    }

    fn title_pattern(&self, title: &str, outline: &DocumentOutline) -> TitlePattern {
        TitlePattern {
            title_length: title.chars().count(),
            h1_length: outline.first_h1().map(|h| h.chars().count()).unwrap_or(0),
            word_count: title.split_whitespace().count(),
            has_numbers: title.chars().any(|c| c.is_ascii_digit()),
            has_colon: title.contains(':'),
            has_dash: title.contains('-'),
            title_format: self.titles.classify(title),
            common_words: common_words(title),
        }
    }

    fn section_structure(&self, outline: &DocumentOutline) -> SectionStructure {
        let section_types: Vec<SectionType> = outline
            .headings
            .iter()
            .map(|h| self.sections.classify(&h.text))
            .collect();
        let distinct: BTreeSet<_> = section_types.iter().collect();
        let total_headings = outline.headings.len();

        SectionStructure {
            total_headings,
            heading_hierarchy: outline.headings.iter().map(|h| h.tag()).collect(),
            has_introduction: section_types.contains(&SectionType::Introduction),
            has_conclusion: section_types.contains(&SectionType::Conclusion),
            avg_section_length: total_headings as f64 / distinct.len().max(1) as f64,
            section_types,
        }
    }

    fn content_patterns(&self, outline: &DocumentOutline) -> ContentPatterns {
        let paragraph_count = outline.paragraphs.len();
        let paragraph_words: usize = outline
            .paragraphs
            .iter()
            .map(|p| p.split_whitespace().count())
            .sum();
        let word_count = outline.text.split_whitespace().count();

        ContentPatterns {
            paragraph_count,
            avg_paragraph_length: paragraph_words as f64 / paragraph_count.max(1) as f64,
            list_count: outline.list_items,
            code_block_count: outline.code_blocks,
            image_count: outline.images,
            word_count,
            has_call_to_action: self.has_call_to_action(&outline.text),
            content_density: word_count as f64 / paragraph_count.max(1) as f64,
        }
    }

    fn has_call_to_action(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.cta_phrases.iter().any(|p| text.contains(p.as_str()))
    }
}

fn seo_patterns(outline: &DocumentOutline) -> SeoPatterns {
    let mut heading_structure = BTreeMap::new();
    for heading in &outline.headings {
        *heading_structure.entry(heading.tag()).or_insert(0) += 1;
    }

    SeoPatterns {
        has_meta_description: outline.meta_description.is_some(),
        meta_description_length: outline
            .meta_description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0),
        has_meta_keywords: outline.has_meta_keywords,
        has_canonical: outline.has_canonical,
        heading_structure,
    }
}

/// The most frequent title words, ties in order of first appearance
fn common_words(title: &str) -> Vec<WordFrequency> {
    let mut counts: Vec<WordFrequency> = Vec::new();

    for word in title.split_whitespace() {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() <= MIN_COMMON_WORD_LEN {
            continue;
        }
        match counts.iter_mut().find(|w| w.word == word) {
            Some(existing) => existing.count += 1,
            None => counts.push(WordFrequency { word, count: 1 }),
        }
    }

    // Stable sort keeps first-appearance order among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(COMMON_WORD_LIMIT);
    counts
}
