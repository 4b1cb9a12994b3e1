//! # Harvester
//!
//! The serial harvesting pipeline: compliance check, rate gate, fetch,
//! extraction and accumulation, one URL at a time. Redirect targets and
//! discovered links go through the same compliance check as any other URL.
//!
//! ## Example
//!
//! ```rust,no_run
//! use harvest::compliance::ComplianceConfig;
//! use harvest::crawler::CrawlerConfig;
//! use harvest::harvester::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut harvester = Harvester::new(CrawlerConfig::default(), ComplianceConfig::default())?;
//!
//!     let report = harvester
//!         .harvest_all([("dev_to", "https://dev.to/some-post")])
//!         .await;
//!     for failure in &report.failures {
//!         eprintln!("{}: {}", failure.url, failure.reason);
//!     }
//!
//!     let summary = harvester.summary()?;
//!     println!("{} patterns", summary.total_patterns);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::compliance::{
    ComplianceConfig, ComplianceDecision, ComplianceEngine, ComplianceError, RobotsPolicyCache,
};
use crate::crawler::{
    ContentFetcher, CrawlerConfig, FetchError, FetchedPage, LinkKind, RateGate, extract_links,
};
use crate::insights::{InsightAggregator, InsightError, InsightSummary};
use crate::patterns::{Document, PatternExtractor, PatternRecord};

/// Error type for harvesting one URL
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The compliance engine refused the URL
    #[error("{url} denied ({}): {}", .decision.reason, .decision.message)]
    Denied {
        url: String,
        decision: Box<ComplianceDecision>,
    },

    /// The URL could not be evaluated
    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    /// Fetching the page failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The page kept redirecting past the hop limit
    #[error("{url} redirected more than {limit} times")]
    TooManyRedirects { url: String, limit: usize },
}

/// Redirect hops followed for one URL, each after its own compliance check
pub const MAX_REDIRECTS: usize = 5;

impl From<HarvestError> for crate::error::Error {
    fn from(err: HarvestError) -> Self {
        match err {
            HarvestError::Denied { url, decision } => crate::error::Error::PolicyDenied {
                url,
                reason: decision.reason.to_string(),
            },
            HarvestError::Compliance(e) => e.into(),
            HarvestError::Fetch(e) => e.into(),
            err @ HarvestError::TooManyRedirects { .. } => {
                crate::error::Error::Fetch(err.to_string())
            }
        }
    }
}

/// A URL that was not harvested and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Number of URLs that produced a record
    pub harvested: usize,

    /// URLs that were denied or failed, in input order
    pub failures: Vec<HarvestFailure>,
}

impl HarvestReport {
    fn record_failure(&mut self, url: &str, err: &HarvestError) {
        if !matches!(err, HarvestError::Denied { .. }) {
            warn!("Failed to harvest {}: {}", url, err);
        }
        self.failures.push(HarvestFailure {
            url: url.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Runs the harvesting pipeline and keeps the records it produces
///
/// All state (domain policies, rate clocks, records) belongs to one harvester
/// and requests are issued one at a time through `&mut self`.
#[derive(Debug)]
pub struct Harvester {
    engine: ComplianceEngine,
    gate: RateGate,
    fetcher: ContentFetcher,
    extractor: PatternExtractor,
    records: Vec<PatternRecord>,
}

impl Harvester {
    /// Create a harvester whose robots.txt lookups and page fetches share one client
    ///
    /// # Arguments
    ///
    /// * `crawler` - User agent, timeout and crawl delay cap
    /// * `compliance` - Blacklist, whitelist, known APIs and policy defaults
    ///
    /// # Returns
    ///
    /// The harvester, or an error if the HTTP client cannot be built
    pub fn new(crawler: CrawlerConfig, compliance: ComplianceConfig) -> Result<Self, FetchError> {
        let client = crawler.build_client()?;
        let robots = RobotsPolicyCache::new(client.clone(), crawler.user_agent.clone());

        Ok(Self::from_parts(
            ComplianceEngine::new(compliance, robots),
            RateGate::new(crawler.max_crawl_delay()),
            ContentFetcher::with_client(client, &crawler),
            PatternExtractor::default(),
        ))
    }

    /// Assemble a harvester from prepared components
    pub fn from_parts(
        engine: ComplianceEngine,
        gate: RateGate,
        fetcher: ContentFetcher,
        extractor: PatternExtractor,
    ) -> Self {
        Self {
            engine,
            gate,
            fetcher,
            extractor,
            records: Vec::new(),
        }
    }

    /// Replace the pattern extractor
    pub fn with_extractor(mut self, extractor: PatternExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn engine(&self) -> &ComplianceEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ComplianceEngine {
        &mut self.engine
    }

    /// Harvest one URL
    ///
    /// # Arguments
    ///
    /// * `platform` - Label stored in the record
    /// * `url` - The page to harvest
    ///
    /// # Returns
    ///
    /// The new record, `HarvestError::Denied` when the compliance engine
    /// refuses the URL or a redirect target, or the fetch error
    #[instrument(skip(self))]
    pub async fn harvest(
        &mut self,
        platform: &str,
        url: &str,
    ) -> Result<&PatternRecord, HarvestError> {
        let page = self.fetch_allowed(url).await?;

        let title = page.metadata.title.clone().unwrap_or_default();
        let record = self
            .extractor
            .extract(platform, url, &title, &Document::Html(page.html));
        Ok(self.push(record))
    }

    /// Fetch a listing page and collect the links of one kind on it
    ///
    /// The listing page itself must pass the compliance check. The returned
    /// links are not checked here; harvesting them checks each one.
    ///
    /// # Arguments
    ///
    /// * `url` - A topic index or topic page
    /// * `kind` - Whether to collect topic links or article links
    /// * `max` - Largest number of links to return
    ///
    /// # Returns
    ///
    /// Absolute, deduplicated links in page order
    #[instrument(skip(self))]
    pub async fn discover(
        &mut self,
        url: &str,
        kind: LinkKind,
        max: usize,
    ) -> Result<Vec<String>, HarvestError> {
        let page = self.fetch_allowed(url).await?;
        let base = Url::parse(&page.final_url).map_err(FetchError::from)?;

        let links = extract_links(&base, &page.html, kind, max);
        info!("Found {} {:?} links on {}", links.len(), kind, url);
        Ok(links)
    }

    /// Harvest a platform starting from its topic index
    ///
    /// Topic links are collected from `topics_url`, then article links from
    /// each topic page, and every article is harvested. At most
    /// `max_articles` articles are attempted, spread evenly over the topics.
    /// Discovery failures are reported like harvest failures.
    ///
    /// # Arguments
    ///
    /// * `platform` - Label stored in every record
    /// * `topics_url` - The platform's topic index
    /// * `max_topics` - Largest number of topic pages to visit
    /// * `max_articles` - Largest number of articles to attempt
    pub async fn harvest_platform(
        &mut self,
        platform: &str,
        topics_url: &str,
        max_topics: usize,
        max_articles: usize,
    ) -> HarvestReport {
        let mut report = HarvestReport::default();

        let topics = match self.discover(topics_url, LinkKind::Topic, max_topics).await {
            Ok(topics) => topics,
            Err(e) => {
                info!("No topics for {}", platform);
                report.record_failure(topics_url, &e);
                return report;
            }
        };

        let per_topic = (max_articles / max_topics.max(1)).max(1);
        let mut articles: Vec<String> = Vec::new();
        for topic in &topics {
            match self.discover(topic, LinkKind::Article, per_topic).await {
                Ok(found) => {
                    for article in found {
                        if articles.len() < max_articles && !articles.contains(&article) {
                            articles.push(article);
                        }
                    }
                }
                Err(e) => report.record_failure(topic, &e),
            }
        }

        let harvested = self
            .harvest_all(articles.iter().map(|article| (platform, article.as_str())))
            .await;
        report.harvested += harvested.harvested;
        report.failures.extend(harvested.failures);

        info!(
            "{}: harvested {} of {} articles from {} topics",
            platform,
            report.harvested,
            articles.len(),
            topics.len()
        );
        report
    }

    /// Harvest every target, continuing past denials and failures
    pub async fn harvest_all<I, P, U>(&mut self, targets: I) -> HarvestReport
    where
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: AsRef<str>,
    {
        self.harvest_all_with(targets, |_| {}).await
    }

    /// Harvest every target, calling `on_done` with each URL once it is finished
    pub async fn harvest_all_with<I, P, U, F>(
        &mut self,
        targets: I,
        mut on_done: F,
    ) -> HarvestReport
    where
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: AsRef<str>,
        F: FnMut(&str),
    {
        let mut report = HarvestReport::default();

        for (platform, url) in targets {
            let url = url.as_ref();
            match self.harvest(platform.as_ref(), url).await {
                Ok(_) => report.harvested += 1,
                Err(e) => report.record_failure(url, &e),
            }
            on_done(url);
        }

        info!(
            "Harvested {} URLs, {} failed or denied",
            report.harvested,
            report.failures.len()
        );
        report
    }

    /// Extract a record from text that was obtained elsewhere, without network access
    pub fn analyze(
        &mut self,
        platform: &str,
        url: &str,
        title: &str,
        text: &str,
    ) -> &PatternRecord {
        let record = self
            .extractor
            .extract(platform, url, title, &Document::detect(text));
        self.push(record)
    }

    /// Records harvested so far, in harvest order
    pub fn records(&self) -> &[PatternRecord] {
        &self.records
    }

    /// Summarize the records harvested so far
    pub fn summary(&self) -> Result<InsightSummary, InsightError> {
        InsightAggregator::summarize(&self.records)
    }

    pub fn into_records(self) -> Vec<PatternRecord> {
        self.records
    }

    /// Check, gate and fetch a URL, re-checking every redirect target
    async fn fetch_allowed(&mut self, url: &str) -> Result<FetchedPage, HarvestError> {
        let mut target = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let policy = match self.engine.check(&target).await? {
                ComplianceDecision {
                    allowed: true,
                    policy: Some(policy),
                    ..
                } => policy,
                decision => {
                    info!("Skipping {}: {}", target, decision.reason);
                    return Err(HarvestError::Denied {
                        url: target,
                        decision: Box::new(decision),
                    });
                }
            };

            self.gate.wait(&policy.domain, policy.crawl_delay).await;
            match self.fetcher.fetch(&target, &policy).await {
                Ok(mut page) => {
                    if page.attribution_required {
                        info!("Content from {} requires attribution", policy.domain);
                    }
                    page.url = url.to_string();
                    return Ok(page);
                }
                Err(FetchError::Redirect { location, .. }) => {
                    debug!("Following redirect from {} to {}", target, location);
                    target = location;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(HarvestError::TooManyRedirects {
            url: url.to_string(),
            limit: MAX_REDIRECTS,
        })
    }

    fn push(&mut self, record: PatternRecord) -> &PatternRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::DecisionReason;
    use crate::patterns::TitleFormat;
    use mockito::{Server, ServerGuard};

    const POST: &str = r#"<html><head>
        <title>How to Test Async Rust: A Guide</title>
        <meta name="description" content="Testing guide">
        <script>window.track()</script>
        </head><body>
        <h1>How to Test Async Rust</h1>
        <h2>Introduction</h2><p>Async code needs care.</p>
        <h2>Conclusion</h2><p>Subscribe for more.</p>
        </body></html>"#;

    const TOPIC: &str = r##"<html><body>
        <a href="/post/first">First</a>
        <a href="/post/first#comments">First, comments</a>
        <a href="/private/post/second">Second</a>
        <a href="/tag/rust">Rust</a>
        </body></html>"##;

    fn harvester() -> Harvester {
        let crawler = CrawlerConfig::builder()
            .max_crawl_delay_ms(0)
            .timeout_secs(5)
            .build();
        Harvester::new(crawler, ComplianceConfig::default()).unwrap()
    }

    async fn site() -> ServerGuard {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /private\nCrawl-delay: 2\n")
            .create_async()
            .await;
        server
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(POST)
            .create_async()
            .await;
        server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_harvest_allowed_page() {
        let server = site().await;
        let mut harvester = harvester();

        let url = format!("{}/post", server.url());
        let record = harvester.harvest("blog", &url).await.unwrap();

        assert_eq!(record.platform, "blog");
        assert_eq!(record.url, url);
        assert_eq!(record.title_pattern.title_format, TitleFormat::HowTo);
        assert!(record.title_pattern.has_colon);
        assert!(record.section_structure.has_introduction);
        assert!(record.section_structure.has_conclusion);
        assert_eq!(record.content_patterns.paragraph_count, 2);
        assert!(record.content_patterns.has_call_to_action);
        assert!(record.seo_patterns.has_meta_description);

        assert_eq!(harvester.records().len(), 1);
        let domain = url::Url::parse(&url)
            .ok()
            .and_then(|u| crate::compliance::robots::domain_key(&u))
            .unwrap();
        let policy = harvester.engine().policy(&domain).unwrap();
        assert_eq!(policy.crawl_delay, 2.0);
        assert!(policy.attribution_required);
    }

    #[tokio::test]
    async fn test_robots_denial_is_not_fetched() {
        let mut server = site().await;
        let private = server
            .mock("GET", "/private/post")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/private/post", server.url());
        match harvester.harvest("blog", &url).await {
            Err(HarvestError::Denied { decision, .. }) => {
                assert_eq!(decision.reason, DecisionReason::RobotsDisallowed)
            }
            other => panic!("Expected denial, got {:?}", other.map(|r| r.url.clone())),
        }
        assert!(harvester.records().is_empty());
        private.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_into_disallowed_path_is_denied() {
        let mut server = site().await;
        let moved = server
            .mock("GET", "/moved")
            .with_status(302)
            .with_header("location", "/private/secret")
            .expect(1)
            .create_async()
            .await;
        let private = server
            .mock("GET", "/private/secret")
            .with_status(200)
            .with_body(POST)
            .expect(0)
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/moved", server.url());
        match harvester.harvest("blog", &url).await {
            Err(HarvestError::Denied { url: denied, decision }) => {
                assert_eq!(denied, format!("{}/private/secret", server.url()));
                assert_eq!(decision.reason, DecisionReason::RobotsDisallowed);
            }
            other => panic!("Expected denial, got {:?}", other.map(|r| r.url.clone())),
        }
        assert!(harvester.records().is_empty());

        moved.assert_async().await;
        private.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_to_blacklisted_host_is_denied() {
        let mut server = site().await;
        let _moved = server
            .mock("GET", "/share")
            .with_status(301)
            .with_header("location", "https://www.facebook.com/sharer")
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/share", server.url());
        match harvester.harvest("blog", &url).await {
            Err(HarvestError::Denied { decision, .. }) => {
                assert_eq!(decision.reason, DecisionReason::Blacklisted)
            }
            other => panic!("Expected denial, got {:?}", other.map(|r| r.url.clone())),
        }
    }

    #[tokio::test]
    async fn test_allowed_redirect_is_followed() {
        let mut server = site().await;
        let _moved = server
            .mock("GET", "/old-post")
            .with_status(301)
            .with_header("location", "/post")
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/old-post", server.url());
        let record = harvester.harvest("blog", &url).await.unwrap();
        assert_eq!(record.url, url);
        assert_eq!(record.title_pattern.title_format, TitleFormat::HowTo);
    }

    #[tokio::test]
    async fn test_redirect_loop_stops_at_limit() {
        let mut server = site().await;
        let looping = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(MAX_REDIRECTS + 1)
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/loop", server.url());
        let err = harvester.harvest("blog", &url).await.unwrap_err();
        assert!(matches!(
            err,
            HarvestError::TooManyRedirects { limit: MAX_REDIRECTS, .. }
        ));
        looping.assert_async().await;
    }

    #[tokio::test]
    async fn test_discover_article_links() {
        let mut server = site().await;
        server
            .mock("GET", "/tag/rust")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(TOPIC)
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/tag/rust", server.url());
        let links = harvester.discover(&url, LinkKind::Article, 10).await.unwrap();
        assert_eq!(
            links,
            vec![
                format!("{}/post/first", server.url()),
                format!("{}/private/post/second", server.url()),
            ]
        );
        assert!(harvester.records().is_empty());
    }

    #[tokio::test]
    async fn test_discover_checks_listing_page() {
        let mut server = site().await;
        let listing = server
            .mock("GET", "/private/tag/rust")
            .with_status(200)
            .with_body(TOPIC)
            .expect(0)
            .create_async()
            .await;
        let mut harvester = harvester();

        let url = format!("{}/private/tag/rust", server.url());
        let result = harvester.discover(&url, LinkKind::Article, 10).await;
        assert!(matches!(result, Err(HarvestError::Denied { .. })));
        listing.assert_async().await;
    }

    #[tokio::test]
    async fn test_harvest_platform() {
        let mut server = site().await;
        server
            .mock("GET", "/topics")
            .with_status(200)
            .with_body(
                r#"<html><body>
                <a href="/tag/rust">Rust</a>
                <a href="/about">About</a>
                <a href="/category/missing">Missing</a>
                </body></html>"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/tag/rust")
            .with_status(200)
            .with_body(TOPIC)
            .create_async()
            .await;
        server
            .mock("GET", "/category/missing")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/post/first")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(POST)
            .create_async()
            .await;
        let private = server
            .mock("GET", "/private/post/second")
            .expect(0)
            .create_async()
            .await;
        let mut harvester = harvester();

        let topics_url = format!("{}/topics", server.url());
        let report = harvester.harvest_platform("blog", &topics_url, 3, 10).await;

        assert_eq!(report.harvested, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].url, format!("{}/category/missing", server.url()));
        assert!(report.failures[0].reason.contains("404"));
        assert_eq!(
            report.failures[1].url,
            format!("{}/private/post/second", server.url())
        );
        assert!(report.failures[1].reason.contains("robots_disallowed"));

        assert_eq!(harvester.records().len(), 1);
        assert_eq!(harvester.records()[0].platform, "blog");
        private.assert_async().await;
    }

    #[tokio::test]
    async fn test_harvest_platform_denied_index() {
        let mut harvester = harvester();
        let report = harvester
            .harvest_platform("medium", "https://medium.com/topics", 3, 10)
            .await;

        assert_eq!(report.harvested, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("blacklisted"));
    }

    #[tokio::test]
    async fn test_blacklisted_url_needs_no_network() {
        let mut harvester = harvester();
        let err = harvester
            .harvest("social", "https://www.facebook.com/some/page")
            .await
            .unwrap_err();

        let crate_err: crate::error::Error = err.into();
        match crate_err {
            crate::error::Error::PolicyDenied { reason, .. } => assert_eq!(reason, "blacklisted"),
            other => panic!("Expected PolicyDenied, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let server = site().await;
        let mut harvester = harvester();

        let targets = vec![
            ("blog", format!("{}/broken", server.url())),
            ("social", "https://twitter.com/someone".to_string()),
            ("blog", format!("{}/post", server.url())),
            ("blog", "not a url".to_string()),
        ];
        let mut finished = Vec::new();
        let report = harvester
            .harvest_all_with(targets.clone(), |url| finished.push(url.to_string()))
            .await;

        assert_eq!(report.harvested, 1);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failures[0].url, targets[0].1);
        assert!(report.failures[0].reason.contains("500"));
        assert!(report.failures[1].reason.contains("blacklisted"));
        assert_eq!(report.failures[2].url, "not a url");
        assert_eq!(finished.len(), 4);

        let summary = harvester.summary().unwrap();
        assert_eq!(summary.total_patterns, 1);
        assert_eq!(harvester.into_records().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_without_network() {
        let mut harvester = harvester();
        assert_eq!(harvester.summary(), Err(InsightError::EmptyCorpus));

        let record = harvester.analyze(
            "dev_to",
            "https://dev.to/sample",
            "10 Essential JavaScript Tips Every Developer Should Know",
            "## Introduction\n\nTips.\n\n\
             ## Technical Implementation\n\nCode.\n\n\
             ## Conclusion\n\nBye.\n",
        );
        assert_eq!(record.title_pattern.title_format, TitleFormat::Listicle);
        assert_eq!(record.section_structure.total_headings, 3);

        harvester.analyze(
            "dev_to",
            "https://dev.to/html",
            "",
            "<html><head><title>Why Rust</title></head></html>",
        );
        assert_eq!(harvester.records().len(), 2);
        assert_eq!(
            harvester.records()[1].title_pattern.title_format,
            TitleFormat::Question
        );
    }
}
