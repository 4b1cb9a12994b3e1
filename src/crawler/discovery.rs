//! Link discovery on topic and listing pages
//!
//! Topic index pages lead to topic pages, and topic pages lead to articles.
//! Both steps keep the `a[href]` links whose raw href contains one of a
//! small set of path markers.

use std::collections::HashSet;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Path markers of links to topic, tag or category pages
pub const TOPIC_INDICATORS: [&str; 3] = ["/tag/", "/topic/", "/category/"];

/// Path markers of links that look like articles
pub const ARTICLE_INDICATORS: [&str; 7] = [
    "/p/",
    "/@",
    "/dev.to/",
    "/hashnode.dev/",
    "/post/",
    "/article/",
    "/blog/",
];

/// The kind of link collected from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Links to topic pages, collected from a topic index
    Topic,
    /// Links to articles, collected from a topic page
    Article,
}

impl LinkKind {
    pub fn indicators(&self) -> &'static [&'static str] {
        match self {
            LinkKind::Topic => &TOPIC_INDICATORS,
            LinkKind::Article => &ARTICLE_INDICATORS,
        }
    }

    /// Check if a raw href carries one of this kind's markers
    pub fn matches(&self, href: &str) -> bool {
        self.indicators().iter().any(|marker| href.contains(marker))
    }
}

/// Collect links of one kind from an HTML page
///
/// # Arguments
///
/// * `base` - URL the page was served from, used to resolve relative links
/// * `html` - The page markup
/// * `kind` - Which links to keep
/// * `max` - Largest number of links to return
///
/// # Returns
///
/// Absolute http(s) URLs without fragments, deduplicated, in page order
pub fn extract_links(base: &Url, html: &str, kind: LinkKind, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
    {
        if links.len() >= max {
            break;
        }
        if !kind.matches(href) {
            continue;
        }

        let Ok(mut link) = base.join(href) else {
            debug!("Skipping unresolvable link {}", href);
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        link.set_fragment(None);

        if seen.insert(link.to_string()) {
            links.push(link.to_string());
        }
    }

    links
}
