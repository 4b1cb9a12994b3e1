//! Reduction of HTML and Markdown documents to a common outline

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::crawler::{normalize_whitespace, visible_text};

/// Class name fragments that mark social sharing links and buttons
const SOCIAL_CLASS_MARKERS: [&str; 4] = ["share", "social", "twitter", "facebook"];

/// Class name fragments that mark comment sections
const COMMENT_CLASS_MARKERS: [&str; 2] = ["comment", "discussion"];

/// Words that mark social sharing in Markdown text
const SOCIAL_WORDS: [&str; 2] = ["share", "social"];

/// Words that mark comment sections in Markdown text
const COMMENT_WORDS: [&str; 3] = ["comment", "discussion", "thoughts"];

/// A document to extract patterns from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Html(String),
    Markdown(String),
}

impl Document {
    /// Treat text that starts with a tag as HTML and anything else as Markdown
    pub fn detect(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('<') {
            Self::Html(text)
        } else {
            Self::Markdown(text)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Html(text) | Self::Markdown(text) => text,
        }
    }

    /// Reduce the document to its outline
    pub fn outline(&self) -> DocumentOutline {
        match self {
            Self::Html(html) => DocumentOutline::from_html(html),
            Self::Markdown(markdown) => DocumentOutline::from_markdown(markdown),
        }
    }
}

/// A heading with its level (1 to 6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

impl Heading {
    /// The heading's tag name ("h1", "h2", ...)
    pub fn tag(&self) -> String {
        format!("h{}", self.level)
    }
}

/// The structural signals of a document, independent of its markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOutline {
    /// Contents of the HTML `<title>` element
    pub page_title: Option<String>,

    /// Headings in document order
    pub headings: Vec<Heading>,

    /// Paragraph texts in document order
    pub paragraphs: Vec<String>,

    pub list_items: usize,
    pub code_blocks: usize,
    pub images: usize,

    /// All readable text with whitespace collapsed
    pub text: String,

    pub meta_description: Option<String>,
    pub has_meta_keywords: bool,
    pub has_canonical: bool,

    pub social_markers: usize,
    pub comment_markers: usize,
}

impl DocumentOutline {
    /// Build the outline of an HTML document
    ///
    /// Elements are matched by tag name while walking the tree once.
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut outline = Self {
            text: visible_text(document.root_element()),
            ..Self::default()
        };

        for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
            let value = element.value();
            let class = value.attr("class").map(str::to_lowercase).unwrap_or_default();

            match value.name() {
                "title" if outline.page_title.is_none() => {
                    outline.page_title = Some(visible_text(element));
                }
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = value.name()[1..].parse().unwrap_or(1);
                    outline.headings.push(Heading {
                        level,
                        text: visible_text(element),
                    });
                }
                "p" => outline.paragraphs.push(visible_text(element)),
                "li" => outline.list_items += 1,
                "pre" => outline.code_blocks += 1,
                "img" => outline.images += 1,
                "meta" => {
                    let name = value.attr("name").map(str::to_lowercase);
                    match name.as_deref() {
                        Some("description") if outline.meta_description.is_none() => {
                            outline.meta_description =
                                Some(value.attr("content").unwrap_or_default().to_string());
                        }
                        Some("keywords") => outline.has_meta_keywords = true,
                        _ => {}
                    }
                }
                "link" => {
                    let rel = value.attr("rel").map(str::to_lowercase).unwrap_or_default();
                    if rel.split_whitespace().any(|r| r == "canonical") {
                        outline.has_canonical = true;
                    }
                }
                "a" | "button" if mentions_any(&class, &SOCIAL_CLASS_MARKERS) => {
                    outline.social_markers += 1;
                }
                "div" | "section" if mentions_any(&class, &COMMENT_CLASS_MARKERS) => {
                    outline.comment_markers += 1;
                }
                _ => {}
            }
        }

        debug!(
            "HTML outline: {} headings, {} paragraphs",
            outline.headings.len(),
            outline.paragraphs.len()
        );
        outline
    }

    /// Build the outline of a Markdown document
    ///
    /// A leading `---` delimited front matter block supplies the SEO signals.
    /// Paragraphs are the non-empty blocks between blank lines of the body.
    pub fn from_markdown(markdown: &str) -> Self {
        let (front_matter, body) = split_front_matter(markdown);
        let mut outline = Self {
            paragraphs: blank_line_blocks(body),
            ..Self::default()
        };

        if let Some(front_matter) = front_matter {
            apply_front_matter(&mut outline, front_matter);
        }

        let mut text = String::new();
        let mut heading: Option<Heading> = None;

        for event in Parser::new(body) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading = Some(Heading {
                        level: level as u8,
                        text: String::new(),
                    });
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(mut done) = heading.take() {
                        done.text = normalize_whitespace(&done.text);
                        outline.headings.push(done);
                    }
                }
                Event::Start(Tag::Item) => outline.list_items += 1,
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                    outline.code_blocks += 1;
                }
                Event::Start(Tag::Image { .. }) => outline.images += 1,
                Event::Text(fragment) | Event::Code(fragment) => {
                    if let Some(heading) = &mut heading {
                        heading.text.push_str(&fragment);
                    }
                    text.push_str(&fragment);
                    text.push(' ');
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(heading) = &mut heading {
                        heading.text.push(' ');
                    }
                    text.push(' ');
                }
                _ => {}
            }
        }

        outline.text = normalize_whitespace(&text);

        let lowered = outline.text.to_lowercase();
        outline.social_markers = count_occurrences(&lowered, &SOCIAL_WORDS);
        outline.comment_markers = count_occurrences(&lowered, &COMMENT_WORDS);

        debug!(
            "Markdown outline: {} headings, {} paragraphs",
            outline.headings.len(),
            outline.paragraphs.len()
        );
        outline
    }

    /// The text of the first level-1 heading
    pub fn first_h1(&self) -> Option<&str> {
        self.headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.as_str())
    }
}

fn mentions_any(haystack: &str, needles: &[&str]) -> bool {
    !haystack.is_empty() && needles.iter().any(|n| haystack.contains(n))
}

fn count_occurrences(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().map(|n| haystack.matches(n).count()).sum()
}

/// Split a leading `---` front matter block from the body
fn split_front_matter(markdown: &str) -> (Option<&str>, &str) {
    let Some(rest) = markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))
    else {
        return (None, markdown);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if matches!(line.trim_end(), "---" | "...") {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    // Unterminated: not front matter
    (None, markdown)
}

/// Read the flat `key: value` pairs the SEO analysis needs
fn apply_front_matter(outline: &mut DocumentOutline, front_matter: &str) {
    for line in front_matter.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');

        match key.trim().to_lowercase().as_str() {
            "description" => outline.meta_description = Some(value.to_string()),
            "keywords" | "tags" => outline.has_meta_keywords = true,
            "canonical_url" | "canonical" => outline.has_canonical = !value.is_empty(),
            _ => {}
        }
    }
}

fn blank_line_blocks(body: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(normalize_whitespace(&current));
                current.clear();
            }
        } else {
            current.push_str(line);
            current.push(' ');
        }
    }
    if !current.is_empty() {
        blocks.push(normalize_whitespace(&current));
    }

    blocks
}
