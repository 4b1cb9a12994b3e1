//! The compliance engine: one allow/deny decision per URL.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, instrument};
use url::Url;

use super::config::ComplianceConfig;
use super::error::ComplianceError;
use super::robots::{RobotsPolicyCache, domain_key};
use super::terms::{PermissiveTerms, TermsPolicy};
use super::{ComplianceDecision, DecisionReason, DomainPolicy};

/// Evaluates whether URLs may be harvested and tracks per-domain policy.
///
/// Checks run in a fixed order and stop at the first denial: blacklist,
/// robots.txt, API preference, terms of service. The robots step records the
/// domain's [`DomainPolicy`] even when a later step denies the URL.
#[derive(Debug)]
pub struct ComplianceEngine {
    config: ComplianceConfig,
    robots: RobotsPolicyCache,
    terms: Box<dyn TermsPolicy>,
    policies: HashMap<String, DomainPolicy>,
}

impl ComplianceEngine {
    /// Create an engine over an injected robots cache
    pub fn new(config: ComplianceConfig, robots: RobotsPolicyCache) -> Self {
        Self {
            config,
            robots,
            terms: Box::new(PermissiveTerms),
            policies: HashMap::new(),
        }
    }

    /// Replace the terms-of-service policy
    pub fn with_terms_policy(mut self, terms: impl TermsPolicy + 'static) -> Self {
        self.terms = Box::new(terms);
        self
    }

    /// The engine's configuration
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// The policy currently cached for a domain
    pub fn policy(&self, domain: &str) -> Option<&DomainPolicy> {
        self.policies.get(domain)
    }

    /// Forget a domain's policy and robots.txt so the next check resolves them again
    pub fn refresh(&mut self, domain: &str) {
        self.policies.remove(domain);
        self.robots.invalidate(domain);
        debug!("Refreshed compliance state for {}", domain);
    }

    /// Check whether a URL may be harvested
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to check
    ///
    /// # Returns
    ///
    /// The decision; an error only when the URL cannot be evaluated at all
    #[instrument(skip(self))]
    pub async fn check(&mut self, url: &str) -> Result<ComplianceDecision, ComplianceError> {
        let parsed = Url::parse(url)?;
        let domain =
            domain_key(&parsed).ok_or_else(|| ComplianceError::MissingHost(url.to_string()))?;

        if let Some(blocked) = self.config.blacklisted(&domain) {
            info!("{} matches blacklist entry {}", domain, blocked);
            return Ok(ComplianceDecision::deny(
                &domain,
                DecisionReason::Blacklisted,
                format!("{} is on our no-scrape list", domain),
            ));
        }

        let policy = self.evaluate_robots(&parsed, &domain).await;
        if !policy.can_fetch {
            info!("robots.txt disallows {}", url);
            return Ok(ComplianceDecision::deny(
                &domain,
                DecisionReason::RobotsDisallowed,
                format!("robots.txt disallows scraping: {}", url),
            ));
        }

        if let Some(api) = self.config.known_api(&domain) {
            info!("{} has an official API at {}", domain, api.docs);
            return Ok(ComplianceDecision::deny(
                &domain,
                DecisionReason::ApiPreferred,
                format!("Use the official API for {}", domain),
            )
            .with_api(api.clone()));
        }

        if !self.terms.permits(&domain) {
            info!("Terms of service for {} may prohibit scraping", domain);
            return Ok(ComplianceDecision::deny(
                &domain,
                DecisionReason::TosViolation,
                "Terms of service may prohibit scraping",
            ));
        }

        Ok(ComplianceDecision::allow(policy))
    }

    /// Evaluate robots.txt for the URL and record the result on the domain policy.
    ///
    /// Returns a copy of the updated policy; its `can_fetch` is the verdict for this URL.
    async fn evaluate_robots(&mut self, url: &Url, domain: &str) -> DomainPolicy {
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let rules = self.robots.resolve(url).await;
        let can_fetch = rules.is_allowed(&path);
        let now = Utc::now();

        match self.policies.get_mut(domain) {
            Some(policy) => {
                policy.can_fetch = can_fetch;
                policy.last_checked = now;
                policy.clone()
            }
            None => {
                let policy = DomainPolicy {
                    domain: domain.to_string(),
                    can_fetch,
                    crawl_delay: rules.crawl_delay.unwrap_or(self.config.default_crawl_delay),
                    rate_limit: self.config.default_rate_limit,
                    attribution_required: !self.config.is_whitelisted(domain),
                    disallowed_paths: rules.disallowed.clone(),
                    sitemaps: rules.sitemaps.clone(),
                    last_checked: now,
                };
                debug!("New policy for {}: {:?}", domain, policy);
                self.policies.insert(domain.to_string(), policy.clone());
                policy
            }
        }
    }
}
