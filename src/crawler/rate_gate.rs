//! Per-domain crawl delay enforcement.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Spaces out requests to each domain by its crawl delay.
///
/// Every domain has its own clock; waiting for one never delays another. The
/// gate takes `&mut self`, so one caller drives it serially. Running fetches
/// in parallel needs a gate per domain behind a lock instead.
#[derive(Debug)]
pub struct RateGate {
    cap: Duration,
    last_fetch: HashMap<String, Instant>,
}

impl RateGate {
    /// Create a gate that never waits longer than `cap` between requests
    pub fn new(cap: Duration) -> Self {
        Self {
            cap,
            last_fetch: HashMap::new(),
        }
    }

    /// The upper bound on honored crawl delays
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// The delay actually enforced for a crawl delay in seconds
    pub fn effective_delay(&self, crawl_delay: f64) -> Duration {
        if !crawl_delay.is_finite() || crawl_delay <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(crawl_delay)
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    /// Wait until `domain` may be fetched again, then mark it as fetched now.
    ///
    /// The first request to a domain does not wait.
    pub async fn wait(&mut self, domain: &str, crawl_delay: f64) -> Duration {
        let delay = self.effective_delay(crawl_delay);

        let waited = match self.last_fetch.get(domain) {
            Some(last) => {
                let elapsed = last.elapsed();
                if elapsed < delay {
                    let remaining = delay - elapsed;
                    debug!("Waiting {:?} before next request to {}", remaining, domain);
                    tokio::time::sleep(remaining).await;
                    remaining
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };

        self.last_fetch.insert(domain.to_string(), Instant::now());
        waited
    }
}
