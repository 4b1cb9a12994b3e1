//! robots.txt parsing and the per-run policy cache.

use std::collections::HashMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

/// Characters escaped in rule patterns so they compare equal to `Url::path()`.
///
/// `%`, `*` and `$` are left alone: existing escapes and pattern syntax survive.
const PATTERN_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Rules from a robots.txt file that apply to one user agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsRules {
    pub allowed: Vec<String>,
    pub disallowed: Vec<String>,
    pub crawl_delay: Option<f64>,
    pub sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Rules used when a domain has no usable robots.txt.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Rules used when the server refuses access to robots.txt.
    pub fn disallow_all() -> Self {
        Self {
            disallowed: vec!["/".to_string()],
            ..Self::default()
        }
    }

    /// Check if a path (including any query string) may be fetched.
    ///
    /// The path is expected in its percent-encoded form, as `Url::path()`
    /// returns it. The longest matching pattern wins; an allow pattern wins a tie.
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = encode_pattern(path);
        let path = path.as_str();
        if path == "/robots.txt" {
            return true;
        }

        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|pattern| path_matches(path, pattern))
                .map(String::len)
                .max()
        };

        match (longest(&self.allowed), longest(&self.disallowed)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

/// Parse a robots.txt body for a specific user agent.
///
/// Groups naming the agent's product token take precedence over the `*`
/// group. Lines that cannot be understood are skipped.
pub fn parse_robots(txt: &str, user_agent: &str) -> RobotsRules {
    let token = product_token(user_agent);

    let mut specific = RobotsRules::default();
    let mut wildcard = RobotsRules::default();
    let mut found_specific = false;
    let mut sitemaps = Vec::new();

    let mut group_agents: Vec<String> = Vec::new();
    let mut reading_rules = false;

    for line in txt.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                // A user-agent line after rules starts a new group
                if reading_rules {
                    group_agents.clear();
                    reading_rules = false;
                }
                group_agents.push(value.to_ascii_lowercase());
            }
            "allow" | "disallow" | "crawl-delay" => {
                reading_rules = true;
                let for_us = group_agents.iter().any(|agent| {
                    agent != "*" && !agent.is_empty() && token.contains(agent.as_str())
                });
                let for_all = group_agents.iter().any(|agent| agent == "*");

                if for_us {
                    found_specific = true;
                    apply_rule(&mut specific, &key, value);
                }
                if for_all {
                    apply_rule(&mut wildcard, &key, value);
                }
            }
            "sitemap" if !value.is_empty() => sitemaps.push(value.to_string()),
            _ => {}
        }
    }

    let mut rules = if found_specific { specific } else { wildcard };
    rules.sitemaps = sitemaps;
    rules
}

fn apply_rule(rules: &mut RobotsRules, key: &str, value: &str) {
    match key {
        "allow" if !value.is_empty() => rules.allowed.push(encode_pattern(value)),
        // An empty Disallow allows everything
        "disallow" if !value.is_empty() => rules.disallowed.push(encode_pattern(value)),
        "crawl-delay" => match value.parse::<f64>() {
            Ok(delay) if delay.is_finite() && delay >= 0.0 => rules.crawl_delay = Some(delay),
            _ => debug!("Ignoring malformed crawl-delay '{}'", value),
        },
        _ => {}
    }
}

/// Percent-encode a pattern or path and uppercase the hex digits of its escapes.
fn encode_pattern(value: &str) -> String {
    let encoded = utf8_percent_encode(value, PATTERN_ENCODE_SET).to_string();
    if !encoded.contains('%') {
        return encoded;
    }

    let mut normalized = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        normalized.push(c);
        if c == '%' {
            let escape: String = chars.by_ref().take(2).collect();
            if escape.len() == 2 && escape.chars().all(|h| h.is_ascii_hexdigit()) {
                normalized.push_str(&escape.to_ascii_uppercase());
            } else {
                normalized.push_str(&escape);
            }
        }
    }
    normalized
}

/// Lowercased product token of a user agent, e.g. `harvest` for `harvest/0.1 (...)`.
fn product_token(user_agent: &str) -> String {
    user_agent
        .split('/')
        .next()
        .unwrap_or(user_agent)
        .trim()
        .to_ascii_lowercase()
}

/// Match a path against a robots.txt pattern with `*` wildcards and a `$` anchor.
fn path_matches(path: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !path.starts_with(first) {
        return false;
    }

    let rest: Vec<&str> = parts.collect();
    let mut pos = first.len();
    if rest.is_empty() {
        return !anchored || pos == path.len();
    }

    for (i, part) in rest.iter().enumerate() {
        if anchored && i == rest.len() - 1 {
            return path[pos..].ends_with(part);
        }
        match path[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }

    true
}

/// Cache key for a URL: the host, plus the port when one is given explicitly.
pub fn domain_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Process-lifetime cache of robots.txt rule sets, keyed by domain.
///
/// A domain's robots.txt is fetched at most once per cache; failures to fetch
/// or read it fall back to permissive rules and are logged, never returned.
#[derive(Debug, Clone)]
pub struct RobotsPolicyCache {
    client: Client,
    user_agent: String,
    rules: HashMap<String, RobotsRules>,
}

impl RobotsPolicyCache {
    /// Create an empty cache that fetches with `client` as `user_agent`
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            rules: HashMap::new(),
        }
    }

    /// The user agent rules are evaluated for
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Rules already resolved for a domain, without fetching
    pub fn cached(&self, domain: &str) -> Option<&RobotsRules> {
        self.rules.get(domain)
    }

    /// Seed the cache with known rules for a domain
    pub fn insert(&mut self, domain: impl Into<String>, rules: RobotsRules) {
        self.rules.insert(domain.into(), rules);
    }

    /// Drop a domain's rules so the next resolve fetches them again
    pub fn invalidate(&mut self, domain: &str) -> Option<RobotsRules> {
        self.rules.remove(domain)
    }

    /// Resolve the rules for the domain of `url`, fetching robots.txt on a miss.
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn resolve(&mut self, url: &Url) -> &RobotsRules {
        let domain = domain_key(url).unwrap_or_default();
        if !self.rules.contains_key(&domain) {
            let rules = self.fetch_rules(url).await;
            debug!(
                "Resolved robots.txt for {}: {} disallow, {} allow, crawl-delay {:?}",
                domain,
                rules.disallowed.len(),
                rules.allowed.len(),
                rules.crawl_delay
            );
            self.rules.insert(domain.clone(), rules);
        }
        &self.rules[&domain]
    }

    async fn fetch_rules(&self, url: &Url) -> RobotsRules {
        let robots_url = match url.join("/robots.txt") {
            Ok(robots_url) => robots_url,
            Err(e) => {
                warn!("Cannot build robots.txt URL for {}: {}", url, e);
                return RobotsRules::allow_all();
            }
        };

        let response = match self
            .client
            .get(robots_url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("robots.txt read failed for {}: {}", robots_url, e);
                return RobotsRules::allow_all();
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(
                "robots.txt at {} returned {}, treating domain as disallowed",
                robots_url, status
            );
            return RobotsRules::disallow_all();
        }
        if status == StatusCode::NOT_FOUND {
            debug!("No robots.txt at {}", robots_url);
            return RobotsRules::allow_all();
        }
        if !status.is_success() {
            warn!("robots.txt at {} returned {}, assuming no restrictions", robots_url, status);
            return RobotsRules::allow_all();
        }

        match response.text().await {
            Ok(body) => parse_robots(&body, &self.user_agent),
            Err(e) => {
                warn!("robots.txt body unreadable for {}: {}", robots_url, e);
                RobotsRules::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const AGENT: &str =
        "harvest/0.1 (+https://harvest.ai; legal@harvest.ai) Educational Content Bot";

    #[test]
    fn test_parse_robots() {
        let txt = r#"
User-agent: *
Allow: /
Disallow: /admin
Disallow: /private/
Crawl-delay: 1.5

Sitemap: https://example.com/sitemap.xml
Sitemap: https://example.com/sitemap-blog.xml
"#;

        let rules = parse_robots(txt, AGENT);
        assert_eq!(rules.allowed.len(), 1);
        assert_eq!(rules.disallowed.len(), 2);
        assert_eq!(rules.crawl_delay, Some(1.5));
        assert_eq!(rules.sitemaps.len(), 2);

        assert!(rules.is_allowed("/"));
        assert!(rules.is_allowed("/about"));
        assert!(!rules.is_allowed("/admin"));
        assert!(!rules.is_allowed("/admin/settings"));
        assert!(!rules.is_allowed("/private/data"));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let txt = r#"
User-agent: *
Disallow: /api/
Allow: /api/public/
"#;
        let rules = parse_robots(txt, AGENT);
        assert!(!rules.is_allowed("/api/secret"));
        assert!(rules.is_allowed("/api/public/docs"));
    }

    #[test]
    fn test_specific_group_wins_over_wildcard() {
        let txt = r#"
User-agent: *
Disallow: /

User-agent: Harvest
Disallow: /drafts/
Crawl-delay: 3
"#;
        let rules = parse_robots(txt, AGENT);
        assert!(rules.is_allowed("/posts/hello"));
        assert!(!rules.is_allowed("/drafts/secret"));
        assert_eq!(rules.crawl_delay, Some(3.0));
    }

    #[test]
    fn test_other_agents_are_ignored() {
        let txt = r#"
User-agent: googlebot
User-agent: bingbot
Disallow: /

User-agent: *
Disallow: /tmp/
"#;
        let rules = parse_robots(txt, AGENT);
        assert!(rules.is_allowed("/blog"));
        assert!(!rules.is_allowed("/tmp/x"));
    }

    #[test]
    fn test_wildcards_and_anchors() {
        let txt = r#"
User-agent: *
Disallow: /*.pdf$
Disallow: /search*q=
"#;
        let rules = parse_robots(txt, AGENT);
        assert!(!rules.is_allowed("/files/report.pdf"));
        assert!(rules.is_allowed("/files/report.pdf.html"));
        assert!(!rules.is_allowed("/search?q=rust"));
        assert!(rules.is_allowed("/search"));
    }

    #[test]
    fn test_non_ascii_patterns_match_encoded_paths() {
        let txt = r#"
User-agent: *
Disallow: /café
Disallow: /caf%c3%a9-old
Allow: /café/open house
"#;
        let rules = parse_robots(txt, AGENT);
        assert_eq!(rules.disallowed[0], "/caf%C3%A9");
        assert_eq!(rules.disallowed[1], "/caf%C3%A9-old");
        assert_eq!(rules.allowed[0], "/caf%C3%A9/open%20house");

        let url = Url::parse("https://example.com/café/menu").unwrap();
        assert_eq!(url.path(), "/caf%C3%A9/menu");
        assert!(!rules.is_allowed(url.path()));
        assert!(!rules.is_allowed("/caf%c3%a9-old/menu"));
        assert!(rules.is_allowed("/caf%C3%A9/open%20house"));
        assert!(rules.is_allowed("/cafe/menu"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let txt = "this is not robots\nUser-agent *\nUser-agent: *\nCrawl-delay: soon\nDisallow:\n";
        let rules = parse_robots(txt, AGENT);
        assert_eq!(rules.crawl_delay, None);
        assert!(rules.is_allowed("/anything"));
    }

    #[test]
    fn test_robots_txt_always_allowed() {
        assert!(RobotsRules::disallow_all().is_allowed("/robots.txt"));
        assert!(!RobotsRules::disallow_all().is_allowed("/"));
    }

    #[test]
    fn test_domain_key_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(domain_key(&url).as_deref(), Some("127.0.0.1:8080"));
        let url = Url::parse("https://blog.example.com/a").unwrap();
        assert_eq!(domain_key(&url).as_deref(), Some("blog.example.com"));
    }

    #[tokio::test]
    async fn test_resolve_fetches_once_and_caches() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /private\nCrawl-delay: 2\n")
            .expect(1)
            .create_async()
            .await;

        let mut cache = RobotsPolicyCache::new(Client::new(), AGENT);
        let url = Url::parse(&format!("{}/post", server.url())).unwrap();

        let first = cache.resolve(&url).await.clone();
        let second = cache.resolve(&url).await.clone();
        assert_eq!(first, second);
        assert_eq!(first.crawl_delay, Some(2.0));
        assert!(!first.is_allowed("/private/x"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_missing_robots_is_permissive() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/robots.txt")
            .with_status(500)
            .create_async()
            .await;

        let mut cache = RobotsPolicyCache::new(Client::new(), AGENT);
        let url = Url::parse(&format!("{}/post", server.url())).unwrap();
        assert_eq!(cache.resolve(&url).await, &RobotsRules::allow_all());
    }

    #[tokio::test]
    async fn test_resolve_not_found_robots_is_permissive() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/robots.txt")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let mut cache = RobotsPolicyCache::new(Client::new(), AGENT);
        let url = Url::parse(&format!("{}/post", server.url())).unwrap();
        assert_eq!(cache.resolve(&url).await, &RobotsRules::allow_all());
        assert!(cache.resolve(&url).await.is_allowed("/anything"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_unreachable_host_is_permissive() {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let mut cache = RobotsPolicyCache::new(client, AGENT);

        // Port 9 (discard) is not expected to accept connections on localhost
        let url = Url::parse("http://127.0.0.1:9/page").unwrap();
        assert_eq!(cache.resolve(&url).await, &RobotsRules::allow_all());
        assert_eq!(cache.cached("127.0.0.1:9"), Some(&RobotsRules::allow_all()));
    }

    #[tokio::test]
    async fn test_resolve_forbidden_robots_disallows() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/robots.txt")
            .with_status(403)
            .create_async()
            .await;

        let mut cache = RobotsPolicyCache::new(Client::new(), AGENT);
        let url = Url::parse(&format!("{}/post", server.url())).unwrap();
        assert!(!cache.resolve(&url).await.is_allowed("/post"));
    }

    #[tokio::test]
    async fn test_seeded_rules_skip_network() {
        let mut cache = RobotsPolicyCache::new(Client::new(), AGENT);
        cache.insert("unreachable.invalid", RobotsRules::disallow_all());
        let url = Url::parse("https://unreachable.invalid/page").unwrap();
        assert!(!cache.resolve(&url).await.is_allowed("/page"));
        assert!(cache.invalidate("unreachable.invalid").is_some());
        assert!(cache.cached("unreachable.invalid").is_none());
    }
}
