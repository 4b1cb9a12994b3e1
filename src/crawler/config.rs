//! # Crawler Configuration Module
//!
//! This module provides configuration options for fetching pages, including
//! the identifying user agent, request timeout, the politeness cap applied to
//! robots.txt crawl delays, and the elements stripped before extraction. It
//! uses a builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with fetch parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Default configurations suitable for polite crawling
//! - A fixed, identifying user agent with a contact reference
//! - A bounded crawl delay so a misconfigured robots.txt cannot stall a run

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::crawler::NON_CONTENT_TAGS;

/// The user agent sent with every request, including robots.txt lookups
pub fn default_user_agent() -> String {
    format!(
        "harvest/{} (+https://harvest.ai; legal@harvest.ai) Educational Content Bot",
        env!("CARGO_PKG_VERSION")
    )
}

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// User agent to use for requests
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound in milliseconds on the crawl delay honored between requests
    pub max_crawl_delay_ms: u64,

    /// Elements removed before text extraction
    pub strip_tags: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: 20,
            max_crawl_delay_ms: 5_000,
            strip_tags: NON_CONTENT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the upper bound on honored crawl delays in milliseconds
    pub fn max_crawl_delay_ms(mut self, max_crawl_delay_ms: u64) -> Self {
        self.config.max_crawl_delay_ms = max_crawl_delay_ms;
        self
    }

    /// Set the elements removed before text extraction
    pub fn strip_tags(mut self, strip_tags: Vec<String>) -> Self {
        self.config.strip_tags = strip_tags;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the crawl delay cap as a Duration
    pub fn max_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.max_crawl_delay_ms)
    }

    /// Build the HTTP client shared by the fetcher and the robots cache
    ///
    /// Redirects are not followed. Every redirect target has to pass the
    /// compliance check again before it is requested.
    pub fn build_client(&self) -> reqwest::Result<Client> {
        Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout())
            .redirect(Policy::none())
            .build()
    }
}
