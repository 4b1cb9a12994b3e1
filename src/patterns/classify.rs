//! Ordered keyword classification

use crate::patterns::{SectionType, TitleFormat};

/// Keywords that select one category
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule<C> {
    /// Lowercase keywords, matched as substrings
    pub keywords: Vec<String>,
    pub category: C,
}

/// Classifies text by the first rule with a keyword contained in it
///
/// Text that matches no rule gets the fallback category. Matching is case
/// insensitive and substring based, so "intro" also matches "introducing".
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordClassifier<C> {
    rules: Vec<KeywordRule<C>>,
    fallback: C,
}

impl<C: Copy> KeywordClassifier<C> {
    /// Create a classifier without rules
    pub fn new(fallback: C) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Add a rule after the existing ones
    pub fn with_rule(mut self, keywords: &[&str], category: C) -> Self {
        self.push_rule(keywords, category);
        self
    }

    /// Append a rule; it only applies to text no earlier rule matched
    pub fn push_rule(&mut self, keywords: &[&str], category: C) {
        self.rules.push(KeywordRule {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            category,
        });
    }

    pub fn rules(&self) -> &[KeywordRule<C>] {
        &self.rules
    }

    pub fn fallback(&self) -> C {
        self.fallback
    }

    /// Category of `text`
    pub fn classify(&self, text: &str) -> C {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}

impl KeywordClassifier<TitleFormat> {
    /// Default title rules
    pub fn title_formats() -> Self {
        Self::new(TitleFormat::General)
            .with_rule(&["how to", "guide", "tutorial"], TitleFormat::HowTo)
            .with_rule(&["best", "top", "ultimate", "essential"], TitleFormat::Listicle)
            .with_rule(&["why", "what", "when", "where"], TitleFormat::Question)
            .with_rule(&["case study", "example", "story"], TitleFormat::CaseStudy)
            .with_rule(&["future", "trend", "2024", "2025"], TitleFormat::Trend)
    }
}

impl KeywordClassifier<SectionType> {
    /// Default heading rules
    pub fn section_types() -> Self {
        Self::new(SectionType::Content)
            .with_rule(&["introduction", "intro", "overview"], SectionType::Introduction)
            .with_rule(&["conclusion", "summary", "wrap"], SectionType::Conclusion)
            .with_rule(&["problem", "challenge", "issue"], SectionType::Problem)
            .with_rule(&["solution", "answer", "fix"], SectionType::Solution)
            .with_rule(&["example", "case", "demo"], SectionType::Example)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_formats() {
        let titles = KeywordClassifier::title_formats();
        assert_eq!(
            titles.classify("How to Build a Successful SaaS Product: A Complete Guide for 2024"),
            TitleFormat::HowTo
        );
        assert_eq!(titles.classify("The Ultimate Rust Reading List"), TitleFormat::Listicle);
        assert_eq!(titles.classify("Why Tests Fail"), TitleFormat::Question);
        assert_eq!(titles.classify("A Case Study in Caching"), TitleFormat::CaseStudy);
        assert_eq!(titles.classify("The Future of WebAssembly"), TitleFormat::Trend);
        assert_eq!(titles.classify("Notes on Borrowing"), TitleFormat::General);
        assert_eq!(titles.classify(""), TitleFormat::General);
    }

    #[test]
    fn test_first_rule_wins() {
        // "best" (listicle) and "why" (question) both match
        let titles = KeywordClassifier::title_formats();
        assert_eq!(titles.classify("Why the best code is boring"), TitleFormat::Listicle);
    }

    #[test]
    fn test_section_types() {
        let sections = KeywordClassifier::section_types();
        assert_eq!(sections.classify("Introduction"), SectionType::Introduction);
        assert_eq!(sections.classify("Technical Implementation"), SectionType::Content);
        assert_eq!(sections.classify("Wrapping up"), SectionType::Conclusion);
        assert_eq!(sections.classify("The Challenge"), SectionType::Problem);
        assert_eq!(sections.classify("A Quick Fix"), SectionType::Solution);
        assert_eq!(sections.classify("Live Demo"), SectionType::Example);
    }

    #[test]
    fn test_push_rule_extends_without_reordering() {
        let mut sections = KeywordClassifier::section_types();
        sections.push_rule(&["Benchmarks", "intro"], SectionType::Example);

        assert_eq!(sections.rules().len(), 6);
        assert_eq!(sections.rules()[5].keywords, vec!["benchmarks", "intro"]);
        assert_eq!(sections.classify("BENCHMARKS"), SectionType::Example);
        // Earlier rules still take priority
        assert_eq!(sections.classify("Intro"), SectionType::Introduction);
    }
}
