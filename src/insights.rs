//! Corpus-level statistics over pattern records
//!
//! [`InsightAggregator::summarize`] is a pure reduction: the summary depends
//! only on the set of records, not on their order, and is recomputed from
//! scratch every time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::patterns::{PatternRecord, SectionType, TitleFormat};

/// Error type for aggregation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsightError {
    /// There were no records to summarize
    #[error("No pattern records to summarize")]
    EmptyCorpus,
}

impl From<InsightError> for crate::error::Error {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::EmptyCorpus => crate::error::Error::EmptyCorpus,
        }
    }
}

/// Title statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleInsights {
    pub avg_title_length: f64,
    pub avg_word_count: f64,
    pub format_distribution: BTreeMap<TitleFormat, usize>,
    pub has_numbers_percentage: f64,
    pub has_colon_percentage: f64,
    pub has_dash_percentage: f64,
}

/// Heading structure statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionInsights {
    pub avg_headings: f64,
    pub has_intro_percentage: f64,
    pub has_conclusion_percentage: f64,
    pub avg_section_length: f64,

    /// How many headings of each type occur across all records
    pub section_type_distribution: BTreeMap<SectionType, usize>,
}

/// Body content statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInsights {
    pub avg_paragraphs: f64,
    pub avg_paragraph_length: f64,
    pub has_cta_percentage: f64,
    pub avg_lists: f64,
    pub avg_code_blocks: f64,
    pub avg_images: f64,
    pub avg_word_count: f64,
    pub avg_content_density: f64,
}

/// SEO marker statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoInsights {
    pub has_meta_desc_percentage: f64,
    pub avg_meta_desc_length: f64,
    pub has_keywords_percentage: f64,
    pub has_canonical_percentage: f64,
}

/// Engagement marker statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementInsights {
    pub has_social_percentage: f64,
    pub has_comments_percentage: f64,
    pub avg_social_buttons: f64,
    pub avg_comment_sections: f64,
}

/// Aggregated statistics over a set of pattern records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub total_patterns: usize,

    /// Distinct platforms, sorted
    pub platforms_analyzed: Vec<String>,

    pub title_insights: TitleInsights,
    pub section_insights: SectionInsights,
    pub content_insights: ContentInsights,
    pub seo_insights: SeoInsights,
    pub engagement_insights: EngagementInsights,
}

/// Reduces pattern records to an [`InsightSummary`]
#[derive(Debug, Clone, Copy, Default)]
pub struct InsightAggregator;

impl InsightAggregator {
    /// Summarize the records
    ///
    /// # Arguments
    ///
    /// * `records` - The pattern records to summarize
    ///
    /// # Returns
    ///
    /// The summary, or `InsightError::EmptyCorpus` when there are no records
    pub fn summarize(records: &[PatternRecord]) -> Result<InsightSummary, InsightError> {
        if records.is_empty() {
            return Err(InsightError::EmptyCorpus);
        }
        debug!("Summarizing {} pattern records", records.len());

        let platforms_analyzed = records
            .iter()
            .map(|r| r.platform.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut format_distribution = BTreeMap::new();
        let mut section_type_distribution = BTreeMap::new();
        for record in records {
            *format_distribution
                .entry(record.title_pattern.title_format)
                .or_insert(0) += 1;
            for section_type in &record.section_structure.section_types {
                *section_type_distribution.entry(*section_type).or_insert(0) += 1;
            }
        }

        Ok(InsightSummary {
            total_patterns: records.len(),
            platforms_analyzed,
            title_insights: TitleInsights {
                avg_title_length: mean(records, |r| r.title_pattern.title_length as f64),
                avg_word_count: mean(records, |r| r.title_pattern.word_count as f64),
                format_distribution,
                has_numbers_percentage: percentage(records, |r| r.title_pattern.has_numbers),
                has_colon_percentage: percentage(records, |r| r.title_pattern.has_colon),
                has_dash_percentage: percentage(records, |r| r.title_pattern.has_dash),
            },
            section_insights: SectionInsights {
                avg_headings: mean(records, |r| r.section_structure.total_headings as f64),
                has_intro_percentage: percentage(records, |r| r.section_structure.has_introduction),
                has_conclusion_percentage: percentage(records, |r| {
                    r.section_structure.has_conclusion
                }),
                avg_section_length: mean(records, |r| r.section_structure.avg_section_length),
                section_type_distribution,
            },
            content_insights: ContentInsights {
                avg_paragraphs: mean(records, |r| r.content_patterns.paragraph_count as f64),
                avg_paragraph_length: mean(records, |r| r.content_patterns.avg_paragraph_length),
                has_cta_percentage: percentage(records, |r| r.content_patterns.has_call_to_action),
                avg_lists: mean(records, |r| r.content_patterns.list_count as f64),
                avg_code_blocks: mean(records, |r| r.content_patterns.code_block_count as f64),
                avg_images: mean(records, |r| r.content_patterns.image_count as f64),
                avg_word_count: mean(records, |r| r.content_patterns.word_count as f64),
                avg_content_density: mean(records, |r| r.content_patterns.content_density),
            },
            seo_insights: SeoInsights {
                has_meta_desc_percentage: percentage(records, |r| {
                    r.seo_patterns.has_meta_description
                }),
                avg_meta_desc_length: mean(records, |r| {
                    r.seo_patterns.meta_description_length as f64
                }),
                has_keywords_percentage: percentage(records, |r| r.seo_patterns.has_meta_keywords),
                has_canonical_percentage: percentage(records, |r| r.seo_patterns.has_canonical),
            },
            engagement_insights: EngagementInsights {
                has_social_percentage: percentage(records, |r| {
                    r.engagement_metrics.has_social_sharing
                }),
                has_comments_percentage: percentage(records, |r| r.engagement_metrics.has_comments),
                avg_social_buttons: mean(records, |r| {
                    r.engagement_metrics.social_button_count as f64
                }),
                avg_comment_sections: mean(records, |r| {
                    r.engagement_metrics.comment_section_count as f64
                }),
            },
        })
    }
}

/// Arithmetic mean, summed in sorted order so record order cannot change the result
fn mean(records: &[PatternRecord], field: impl Fn(&PatternRecord) -> f64) -> f64 {
    let mut values: Vec<f64> = records.iter().map(field).collect();
    values.sort_by(f64::total_cmp);
    values.iter().sum::<f64>() / records.len() as f64
}

/// Share of records for which `field` holds, from 0 to 100
fn percentage(records: &[PatternRecord], field: impl Fn(&PatternRecord) -> bool) -> f64 {
    let hits = records.iter().filter(|r| field(r)).count();
    hits as f64 * 100.0 / records.len() as f64
}
