//! # Compliance Configuration Module
//!
//! This module holds the fixed policy data the compliance engine evaluates:
//! the no-scrape blacklist, the educational whitelist that waives the
//! attribution requirement, the domains with official APIs that should be
//! used instead of scraping, and the default etiquette values applied when
//! robots.txt says nothing.
//!
//! ## Key Components
//!
//! - `ComplianceConfig`: The policy data with defaults taken from the harvester's
//!   published scraping policy
//! - `ComplianceConfigBuilder`: Builder pattern implementation for overrides
//! - `KnownApi`: An official API reference surfaced instead of scraping

use serde::{Deserialize, Serialize};

/// A domain with an official API that should be preferred over scraping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownApi {
    /// Domain fragment the API applies to
    pub domain: String,

    /// Documentation reference for the API
    pub docs: String,
}

impl KnownApi {
    /// Create a new API reference
    pub fn new(domain: impl Into<String>, docs: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            docs: docs.into(),
        }
    }
}

/// Configuration for the compliance engine
#[derive(Debug, Clone)]
pub struct ComplianceConfig {
    /// Domain fragments that are never scraped
    pub blacklist: Vec<String>,

    /// Domains exempt from the attribution requirement
    pub educational_whitelist: Vec<String>,

    /// Domains with an official API, checked in order
    pub known_apis: Vec<KnownApi>,

    /// Crawl delay in seconds when robots.txt has none
    pub default_crawl_delay: f64,

    /// Advisory requests per minute recorded on each domain policy
    pub default_rate_limit: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            blacklist: [
                "facebook.com",
                "instagram.com",
                "linkedin.com",
                "twitter.com",
                "medium.com",
                "substack.com",
                "patreon.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            educational_whitelist: [
                "docs.python.org",
                "developer.mozilla.org",
                "w3schools.com",
                "wikipedia.org",
                "github.com",
                "stackoverflow.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            known_apis: vec![
                KnownApi::new("wikipedia.org", "https://www.mediawiki.org/wiki/API:Main_page"),
                KnownApi::new("github.com", "https://docs.github.com/en/rest"),
                KnownApi::new("stackoverflow.com", "https://api.stackexchange.com/"),
            ],
            default_crawl_delay: 1.0,
            default_rate_limit: 30,
        }
    }
}

impl ComplianceConfig {
    /// Create a new builder
    pub fn builder() -> ComplianceConfigBuilder {
        ComplianceConfigBuilder::new()
    }

    /// The blacklist entry matching a domain, if any
    pub fn blacklisted(&self, domain: &str) -> Option<&str> {
        self.blacklist
            .iter()
            .find(|blocked| domain.contains(blocked.as_str()))
            .map(String::as_str)
    }

    /// Whether a domain, or a parent of it, is on the educational whitelist
    pub fn is_whitelisted(&self, domain: &str) -> bool {
        let host = domain.split(':').next().unwrap_or(domain);
        self.educational_whitelist.iter().any(|allowed| {
            host == allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// The official API to use for a domain, if one is known
    pub fn known_api(&self, domain: &str) -> Option<&KnownApi> {
        self.known_apis
            .iter()
            .find(|api| domain.contains(api.domain.as_str()))
    }
}

/// Builder for ComplianceConfig
#[derive(Debug, Default)]
pub struct ComplianceConfigBuilder {
    config: ComplianceConfig,
}

impl ComplianceConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ComplianceConfig::default(),
        }
    }

    /// Replace the blacklist
    pub fn blacklist(mut self, blacklist: Vec<String>) -> Self {
        self.config.blacklist = blacklist;
        self
    }

    /// Add one domain fragment to the blacklist
    pub fn block(mut self, domain: impl Into<String>) -> Self {
        self.config.blacklist.push(domain.into());
        self
    }

    /// Replace the educational whitelist
    pub fn educational_whitelist(mut self, whitelist: Vec<String>) -> Self {
        self.config.educational_whitelist = whitelist;
        self
    }

    /// Replace the known API table
    pub fn known_apis(mut self, known_apis: Vec<KnownApi>) -> Self {
        self.config.known_apis = known_apis;
        self
    }

    /// Set the crawl delay used when robots.txt has none
    pub fn default_crawl_delay(mut self, seconds: f64) -> Self {
        self.config.default_crawl_delay = seconds;
        self
    }

    /// Set the advisory requests per minute
    pub fn default_rate_limit(mut self, per_minute: u32) -> Self {
        self.config.default_rate_limit = per_minute;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ComplianceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklist_is_substring_match() {
        let config = ComplianceConfig::default();
        assert_eq!(config.blacklisted("www.facebook.com"), Some("facebook.com"));
        assert_eq!(config.blacklisted("blog.medium.com"), Some("medium.com"));
        assert_eq!(config.blacklisted("dev.to"), None);
    }

    #[test]
    fn test_whitelist_matches_subdomains_only() {
        let config = ComplianceConfig::default();
        assert!(config.is_whitelisted("wikipedia.org"));
        assert!(config.is_whitelisted("en.wikipedia.org"));
        assert!(!config.is_whitelisted("notwikipedia.org"));
        assert!(config.is_whitelisted("docs.python.org:443"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ComplianceConfig::builder()
            .block("example.net")
            .default_crawl_delay(2.5)
            .default_rate_limit(10)
            .known_apis(Vec::new())
            .build();

        assert!(config.blacklisted("www.example.net").is_some());
        assert_eq!(config.default_crawl_delay, 2.5);
        assert_eq!(config.default_rate_limit, 10);
        assert!(config.known_api("github.com").is_none());
    }
}
