//! Retry with linear backoff
//!
//! Every attempt gets its own timeout. Failures before the last attempt are
//! logged and swallowed; the last one is wrapped in
//! [`FetchError::Exhausted`] together with the URL.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::FetchError;

/// Attempt budget and pacing for one URL
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts (at least one is always made)
    pub max_attempts: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Backoff unit
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt that follows failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `attempt` until it succeeds or the budget is spent.
///
/// The closure receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(url: &str, policy: RetryPolicy, mut attempt: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.timeout, attempt(n)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                secs: policy.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(value) => {
                if n > 1 {
                    debug!("{} succeeded on attempt {}", url, n);
                }
                return Ok(value);
            }
            Err(e) if n >= max_attempts => {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: n,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                warn!("Attempt {} failed for {}: {}", n, url, e);
                tokio::time::sleep(policy.backoff(n)).await;
                n += 1;
            }
        }
    }
}
