//! Terms-of-service policies consulted after the robots and API checks.

use std::collections::HashMap;
use std::fmt::Debug;

/// Decides whether a domain's terms of service permit scraping.
pub trait TermsPolicy: Debug + Send + Sync {
    /// Return `true` if the domain may be scraped
    fn permits(&self, domain: &str) -> bool;
}

/// Permits every domain. Used until a curated policy map is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveTerms;

impl TermsPolicy for PermissiveTerms {
    fn permits(&self, _domain: &str) -> bool {
        true
    }
}

/// A curated per-domain terms map.
///
/// Entries apply to the domain and its subdomains; the most specific entry
/// wins. Domains with no entry get the default verdict.
#[derive(Debug, Clone)]
pub struct TermsPolicyMap {
    entries: HashMap<String, bool>,
    default: bool,
}

impl Default for TermsPolicyMap {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            default: true,
        }
    }
}

impl TermsPolicyMap {
    /// Create an empty map that permits unknown domains
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a domain whose terms permit scraping
    pub fn allow(mut self, domain: impl Into<String>) -> Self {
        self.entries.insert(domain.into().to_ascii_lowercase(), true);
        self
    }

    /// Record a domain whose terms forbid scraping
    pub fn deny(mut self, domain: impl Into<String>) -> Self {
        self.entries.insert(domain.into().to_ascii_lowercase(), false);
        self
    }

    /// Set the verdict for domains without an entry
    pub fn with_default(mut self, permits: bool) -> Self {
        self.default = permits;
        self
    }
}

impl TermsPolicy for TermsPolicyMap {
    fn permits(&self, domain: &str) -> bool {
        let host = domain.split(':').next().unwrap_or(domain).to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(&verdict) = self.entries.get(candidate) {
                return verdict;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return self.default,
            }
        }
    }
}
