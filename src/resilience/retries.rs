//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a response status or a transport error is worth retrying
//! - Execute attempts strictly one after another with exponential backoff
//! - Hand back the last response (or last transport error) once retries run out
//!
//! # Design Decisions
//! - 2xx and 4xx (other than 429) short-circuit: the caller must fix the request
//! - Transport errors are always retryable; statuses only when configured
//! - No jitter, so delays are exactly `base * 2^attempt`

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::exponential_delay;

const TOO_MANY_REQUESTS: u16 = 429;

/// Anything the retry loop can inspect for an HTTP status code.
pub trait HasStatus {
    fn status_code(&self) -> u16;
}

impl HasStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Bounded exponential-backoff retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    retryable_statuses: Vec<u16>,
    base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retryable_statuses: Vec<u16>, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            retryable_statuses,
            base_delay_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retryable_statuses.clone(),
            config.base_delay_ms,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether `status` is in the configured transient set.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay to wait after attempt `attempt` (0-based) before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        exponential_delay(attempt, self.base_delay_ms)
    }

    /// Run `send` until it yields a final outcome.
    ///
    /// Issues at most `max_retries + 1` attempts. Returns the first response
    /// that is successful, a caller error, or not retryable; otherwise the last
    /// response received. A transport error after the final attempt is
    /// propagated.
    pub async fn execute<F, Fut, R, E>(&self, operation: &str, mut send: F) -> Result<R, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: HasStatus,
        E: Display,
    {
        let mut attempt: u32 = 0;

        loop {
            match send().await {
                Ok(response) => {
                    let status = response.status_code();
                    metrics::record_attempt(operation, status);

                    if is_final_status(status) {
                        return Ok(response);
                    }

                    if self.is_retryable_status(status) && attempt < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::info!(
                            operation,
                            attempt,
                            delay = ?delay,
                            status,
                            "Retrying request"
                        );
                        metrics::record_retry(operation);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if self.is_retryable_status(status) {
                        tracing::warn!(operation, attempts = attempt + 1, status, "Retries exhausted");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    metrics::record_transport_error(operation);

                    if attempt < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::info!(
                            operation,
                            attempt,
                            delay = ?delay,
                            error = %e,
                            "Retrying after network error"
                        );
                        metrics::record_retry(operation);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(operation, attempts = attempt + 1, error = %e, "Request failed");
                    return Err(e);
                }
            }
        }
    }
}

/// 2xx, and every 4xx except 429, end the loop regardless of configuration.
fn is_final_status(status: u16) -> bool {
    (200..300).contains(&status) || ((400..500).contains(&status) && status != TOO_MANY_REQUESTS)
}
