//! Content extraction functionality for the crawler module

use crate::crawler::PageMetadata;
use crate::crawler::error::FetchError;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Elements whose text is never part of the readable content
pub const NON_CONTENT_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Parse HTML and detach every element named in `strip_tags`
///
/// # Arguments
///
/// * `html` - The HTML to clean
/// * `strip_tags` - Element names whose whole subtree is removed
///
/// # Returns
///
/// The parsed document without the stripped subtrees
pub fn clean_html(html: &str, strip_tags: &[String]) -> Html {
    let mut document = Html::parse_document(html);

    let doomed: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| strip_tags.iter().any(|tag| tag == element.value().name()))
        .map(|element| element.id())
        .collect();

    debug!("Stripping {} non-content elements", doomed.len());
    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document
}

/// Readable text of an element in document order
///
/// Text nodes are joined with single spaces and script, style and noscript
/// subtrees are skipped.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    normalize_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child) = ElementRef::wrap(child) {
            if !NON_CONTENT_TAGS.contains(&child.value().name()) {
                collect_text(child, out);
            }
        }
    }
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract metadata from a page
///
/// # Arguments
///
/// * `url` - The URL of the page
/// * `document` - The parsed page
///
/// # Returns
///
/// The extracted metadata
pub fn extract_metadata(url: &str, document: &Html) -> Result<PageMetadata, FetchError> {
    // Parse URL to extract domain
    let parsed_url = Url::parse(url).map_err(FetchError::UrlParse)?;

    let domain = parsed_url
        .host_str()
        .ok_or_else(|| FetchError::HtmlParse(format!("No domain in URL {}", url)))?
        .to_string();

    let title_selector = Selector::parse("title")
        .map_err(|e| FetchError::HtmlParse(format!("Failed to parse title selector: {}", e)))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(visible_text)
        .filter(|title| !title.is_empty());

    let description_selector = Selector::parse("meta[name='description']").map_err(|e| {
        FetchError::HtmlParse(format!("Failed to parse description selector: {}", e))
    })?;

    let description = document
        .select(&description_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|s| s.to_string());

    let canonical_selector = Selector::parse("link[rel='canonical']").map_err(|e| {
        FetchError::HtmlParse(format!("Failed to parse canonical selector: {}", e))
    })?;

    let canonical = document
        .select(&canonical_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(|s| s.to_string());

    let author_selector = Selector::parse("meta[name='author']")
        .map_err(|e| FetchError::HtmlParse(format!("Failed to parse author selector: {}", e)))?;

    let author = document
        .select(&author_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|s| s.to_string());

    Ok(PageMetadata {
        title,
        description,
        canonical,
        author,
        domain,
    })
}
