//! # Compliance Module
//!
//! This module decides whether a URL may be fetched at all. It is the first
//! stage of the harvesting pipeline: nothing is requested from a site until
//! the compliance engine has allowed it.
//!
//! ## Key Components
//!
//! - `ComplianceEngine`: Evaluates blacklist, robots.txt, API preference and
//!   terms-of-service checks, in that order, and owns per-domain policy state
//! - `RobotsPolicyCache`: Fetches, parses and caches robots.txt per domain
//! - `TermsPolicy`: Overridable terms-of-service hook
//! - `DomainPolicy`: The etiquette rules resolved for one domain
//! - `ComplianceDecision`: The allow/deny outcome with its reason
//!
//! A denial is an expected outcome, not an error. Callers skip the URL and
//! log the reason.

mod config;
mod engine;
mod error;
pub mod robots;
mod terms;

pub use config::{ComplianceConfig, ComplianceConfigBuilder, KnownApi};
pub use engine::ComplianceEngine;
pub use error::ComplianceError;
pub use robots::{RobotsPolicyCache, RobotsRules, parse_robots};
pub use terms::{PermissiveTerms, TermsPolicy, TermsPolicyMap};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a URL was allowed or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The domain is on the no-scrape list
    Blacklisted,
    /// robots.txt disallows the path for our user agent
    RobotsDisallowed,
    /// The domain has an official API that should be used instead
    ApiPreferred,
    /// The domain's terms of service forbid scraping
    TosViolation,
    /// All checks passed
    Ok,
}

impl DecisionReason {
    /// The reason code as used in logs and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::RobotsDisallowed => "robots_disallowed",
            Self::ApiPreferred => "api_preferred",
            Self::TosViolation => "tos_violation",
            Self::Ok => "ok",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance and etiquette rules resolved for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPolicy {
    /// Domain the policy applies to
    pub domain: String,

    /// Result of the last robots.txt evaluation for this domain
    pub can_fetch: bool,

    /// Minimum seconds between requests to this domain
    pub crawl_delay: f64,

    /// Advisory requests per minute
    pub rate_limit: u32,

    /// Whether harvested content must be attributed to its source
    pub attribution_required: bool,

    /// Disallow patterns from robots.txt
    pub disallowed_paths: Vec<String>,

    /// Sitemaps announced in robots.txt
    pub sitemaps: Vec<String>,

    /// When the policy was last evaluated
    pub last_checked: DateTime<Utc>,
}

/// The allow/deny outcome of a compliance check for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDecision {
    /// Whether the URL may be fetched
    pub allowed: bool,

    /// Why the URL was allowed or denied
    pub reason: DecisionReason,

    /// Domain of the checked URL
    pub domain: String,

    /// Human-readable explanation
    pub message: String,

    /// Official API to use instead, for `api_preferred` denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<KnownApi>,

    /// The domain's policy, present when the URL is allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<DomainPolicy>,
}

impl ComplianceDecision {
    pub(crate) fn deny(domain: &str, reason: DecisionReason, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason,
            domain: domain.to_string(),
            message: message.into(),
            api: None,
            policy: None,
        }
    }

    pub(crate) fn allow(policy: DomainPolicy) -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Ok,
            domain: policy.domain.clone(),
            message: format!("{} may be fetched", policy.domain),
            api: None,
            policy: Some(policy),
        }
    }

    pub(crate) fn with_api(mut self, api: KnownApi) -> Self {
        self.api = Some(api);
        self
    }
}
