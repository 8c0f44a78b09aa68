//! Retry with exponential backoff over a `Transport`.
//!
//! Transient statuses (429, 5xx) and connection-level faults are retried
//! here and never reach the caller; whatever is left after the attempt
//! budget is reported as a terminal `FetchOutcome`.

use std::time::Duration;

use tracing::{debug, warn};

use super::Transport;
use crate::config::HttpConfig;
use crate::shutdown::Shutdown;

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Ceiling for a single computed backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Parse Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Calculate exponential backoff delay for a given retry (0-based).
pub fn backoff_delay(retry: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(retry);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// When and how long to retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// Same policy with no waiting between attempts.
    pub fn without_delay(mut self) -> Self {
        self.base_delay = Duration::ZERO;
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Terminal result of a fetch after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 with its body.
    Ok(String),
    /// Any other status, including a transient one after the budget ran out.
    Status(u16),
    /// Transport fault that could not be recovered.
    Failed(String),
    /// Shutdown requested during a request or while waiting to retry.
    Cancelled,
}

/// Wraps a transport with the retry policy.
pub struct RetryingClient<T> {
    transport: T,
    policy: RetryPolicy,
    shutdown: Shutdown,
}

impl<T: Transport> RetryingClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            shutdown: Shutdown::never(),
        }
    }

    /// Let in-flight requests and backoff sleeps end early on shutdown.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url`, retrying transient failures.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut shutdown = self.shutdown.clone();
        let mut retry = 0u32;

        loop {
            let can_retry = retry < self.policy.max_retries;

            let Some(response) = shutdown.until(self.transport.get(url)).await else {
                debug!("Request to {} abandoned on shutdown", url);
                return FetchOutcome::Cancelled;
            };

            let wait = match response {
                Ok(resp) if resp.status == 200 => {
                    if retry > 0 {
                        debug!("{} succeeded after {} retries", url, retry);
                    }
                    return FetchOutcome::Ok(resp.body);
                }
                Ok(resp) if can_retry && self.policy.is_retryable_status(resp.status) => {
                    let backoff = backoff_delay(retry, self.policy.base_delay);
                    let wait = match resp.status {
                        429 | 503 => parse_retry_after(resp.retry_after.as_deref())
                            .map_or(backoff, |ra| ra.max(backoff)),
                        _ => backoff,
                    };
                    warn!(
                        "HTTP {} for {} (attempt {}/{}), retrying in {:?}",
                        resp.status,
                        url,
                        retry + 1,
                        self.policy.max_attempts(),
                        wait
                    );
                    wait
                }
                Ok(resp) => {
                    debug!("HTTP {} for {}, giving up", resp.status, url);
                    return FetchOutcome::Status(resp.status);
                }
                Err(e) if can_retry && e.is_transient() => {
                    let wait = backoff_delay(retry, self.policy.base_delay);
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}, retrying in {:?}",
                        url,
                        retry + 1,
                        self.policy.max_attempts(),
                        e,
                        wait
                    );
                    wait
                }
                Err(e) => {
                    debug!("Request to {} failed: {}", url, e);
                    return FetchOutcome::Failed(e.to_string());
                }
            };

            if !shutdown.sleep(wait).await {
                return FetchOutcome::Cancelled;
            }
            retry += 1;
        }
    }
}
