//! HTTP fetching of pages that passed the compliance check

use chrono::Utc;
use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};
use url::Url;

use crate::compliance::DomainPolicy;
use crate::crawler::content_extraction::{clean_html, extract_metadata, visible_text};
use crate::crawler::error::FetchError;
use crate::crawler::{CrawlerConfig, FetchedPage};

/// Fetches pages with the harvester's identifying user agent
///
/// Failures are returned to the caller; there is no empty-result fallback.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: Client,
    strip_tags: Vec<String>,
}

impl ContentFetcher {
    /// Create a fetcher with its own client built from the configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(config.build_client()?, config))
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            strip_tags: config.strip_tags.clone(),
        }
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch a page and reduce it to sanitized HTML and plain text
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `policy` - The policy the compliance engine resolved for the URL's domain
    ///
    /// # Returns
    ///
    /// The fetched page, or an error for network failures and non-2xx responses
    #[instrument(skip(self, policy))]
    pub async fn fetch(&self, url: &str, policy: &DomainPolicy) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url)?;

        debug!("Sending GET request to {}", parsed);
        let response = self.client.get(parsed.clone()).send().await?;

        let status = response.status();
        if status.is_redirection() {
            if let Some(location) = redirect_target(&parsed, &response)? {
                debug!("{} redirects to {}", url, location);
                return Err(FetchError::Redirect {
                    url: url.to_string(),
                    location: location.to_string(),
                });
            }
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        let page = self.build_page(url, &final_url, &body, policy)?;

        info!(
            "Fetched {} ({} bytes of text)",
            page.url,
            page.text.len()
        );
        Ok(page)
    }

    fn build_page(
        &self,
        url: &str,
        final_url: &str,
        body: &str,
        policy: &DomainPolicy,
    ) -> Result<FetchedPage, FetchError> {
        let document = clean_html(body, &self.strip_tags);
        let text = visible_text(document.root_element());
        let metadata = extract_metadata(final_url, &document)?;

        Ok(FetchedPage {
            url: url.to_string(),
            final_url: final_url.to_string(),
            html: document.html(),
            text,
            metadata,
            attribution_required: policy.attribution_required,
            fetched_at: Utc::now(),
        })
    }
}

/// Resolve the `Location` header of a redirect against the requested URL
fn redirect_target(base: &Url, response: &Response) -> Result<Option<Url>, FetchError> {
    let Some(location) = response.headers().get(LOCATION) else {
        return Ok(None);
    };
    let Ok(location) = location.to_str() else {
        return Ok(None);
    };
    Ok(Some(base.join(location)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn policy(domain: &str) -> DomainPolicy {
        DomainPolicy {
            domain: domain.to_string(),
            can_fetch: true,
            crawl_delay: 1.0,
            rate_limit: 30,
            attribution_required: true,
            disallowed_paths: Vec::new(),
            sitemaps: Vec::new(),
            last_checked: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fetch_strips_scripts_and_sends_user_agent() {
        let mut server = Server::new_async().await;
        let config = CrawlerConfig::default();
        let mock_server = server
            .mock("GET", "/post")
            .match_header("user-agent", config.user_agent.as_str())
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(
                "<html><head><title>Hello</title><script>alert(1)</script></head>\
                 <body><h1>Hello</h1><p>Some   text.</p><style>p{}</style></body></html>",
            )
            .expect(1)
            .create_async()
            .await;

        let fetcher = ContentFetcher::new(&config).unwrap();
        let url = format!("{}/post", server.url());
        let page = fetcher.fetch(&url, &policy("127.0.0.1")).await.unwrap();

        assert_eq!(page.text, "Hello Hello Some text.");
        assert!(!page.html.contains("alert"));
        assert!(page.html.contains("<h1>Hello</h1>"));
        assert_eq!(page.metadata.title.as_deref(), Some("Hello"));
        assert!(page.attribution_required);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_an_error() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let fetcher = ContentFetcher::new(&CrawlerConfig::default()).unwrap();
        let url = format!("{}/missing", server.url());
        let result = fetcher.fetch(&url, &policy("127.0.0.1")).await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_does_not_follow_redirects() {
        let mut server = Server::new_async().await;
        let moved = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new?page=2")
            .expect(1)
            .create_async()
            .await;
        let target = server
            .mock("GET", "/new")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html></html>")
            .expect(0)
            .create_async()
            .await;

        let fetcher = ContentFetcher::new(&CrawlerConfig::default()).unwrap();
        let url = format!("{}/old", server.url());
        let result = fetcher.fetch(&url, &policy("127.0.0.1")).await;

        match result {
            Err(FetchError::Redirect { url: from, location }) => {
                assert_eq!(from, url);
                assert_eq!(location, format!("{}/new?page=2", server.url()));
            }
            other => panic!("expected a redirect, got {other:?}"),
        }

        moved.assert_async().await;
        target.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_a_status_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/moved")
            .with_status(302)
            .create_async()
            .await;

        let fetcher = ContentFetcher::new(&CrawlerConfig::default()).unwrap();
        let url = format!("{}/moved", server.url());
        let result = fetcher.fetch(&url, &policy("127.0.0.1")).await;

        assert!(matches!(result, Err(FetchError::Status { status: 302, .. })));
    }

    #[tokio::test]
    async fn test_fetch_network_failure_is_an_error() {
        let config = CrawlerConfig::builder().timeout_secs(2).build();
        let fetcher = ContentFetcher::new(&config).unwrap();

        // Port 9 (discard) is not expected to accept connections on localhost
        let result = fetcher
            .fetch("http://127.0.0.1:9/post", &policy("127.0.0.1:9"))
            .await;
        assert!(matches!(result, Err(FetchError::Http(_))));
    }
}
