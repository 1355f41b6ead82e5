//! Transport-level retry for outbound HTTP requests.
//!
//! Requests that fail with 429, a retryable 5xx, or a transport timeout are
//! retried a fixed number of times with exponential backoff before the
//! failure is surfaced. Non-idempotent policies only retry 429 and connect
//! errors, where the server never accepted the request. This is the only
//! retry mechanism in the system; callers above it never retry within a
//! single operation.

use crate::error::{is_retryable_status, FeedError};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Retry policy with exponential backoff.
///
/// ## Default Values
/// - Maximum retries: 3
/// - Initial delay: 500ms, doubling per attempt (500ms, 1s, 2s)
/// - Maximum delay: 10s
/// - Jitter: disabled
/// - Idempotent: yes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    jitter_enabled: bool,
    idempotent: bool,
}

impl RetryPolicy {
    pub fn new(initial_delay_ms: u64, max_delay_ms: u64, max_retries: u32) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            max_retries,
            jitter_enabled: false,
            idempotent: true,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Add 0-25% random jitter to each delay.
    pub fn with_jitter(mut self) -> Self {
        self.jitter_enabled = true;
        self
    }

    /// Restrict retries to failures that cannot have been processed.
    ///
    /// A 5xx or a read timeout may arrive after the server already acted on
    /// the request, so repeating a non-idempotent call could apply it twice.
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based), in milliseconds.
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        // 2^8 = 256x is plenty and keeps the shift in range
        let backoff_power = attempt.saturating_sub(1).min(8);
        let exponential = self.initial_delay_ms.saturating_mul(1 << backoff_power);
        let capped = exponential.min(self.max_delay_ms);

        if self.jitter_enabled {
            let jitter = (capped as f64 * rand::thread_rng().gen::<f64>() * 0.25) as u64;
            capped + jitter
        } else {
            capped
        }
    }

    pub fn calculate_delay_duration(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.calculate_delay(attempt))
    }

    /// Returns `true` if `attempt <= max_retries`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    fn is_retryable_response(&self, status: reqwest::StatusCode) -> bool {
        if self.idempotent {
            is_retryable_status(status)
        } else {
            status == reqwest::StatusCode::TOO_MANY_REQUESTS
        }
    }

    fn is_retryable_error(&self, error: &reqwest::Error) -> bool {
        error.is_connect() || (self.idempotent && error.is_timeout())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(500, 10_000, 3)
    }
}

/// Send a request, retrying transient failures according to `policy`.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by sending. Returns the first successful response, or the last failure
/// mapped to a [`FeedError`].
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    label: &str,
    mut build: F,
) -> Result<reqwest::Response, FeedError>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let mut attempt = 0u32;

    loop {
        let result = build().send().await;

        let retryable = match &result {
            Ok(response) => policy.is_retryable_response(response.status()),
            Err(e) => policy.is_retryable_error(e),
        };

        if retryable && policy.should_retry(attempt + 1) {
            attempt += 1;
            let delay = policy.calculate_delay_duration(attempt);
            match &result {
                Ok(response) => debug!(
                    request = label,
                    status = response.status().as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                ),
                Err(e) => debug!(
                    request = label,
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                ),
            }
            tokio::time::sleep(delay).await;
            continue;
        }

        return match result {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(FeedError::from_status(response.status())),
            Err(e) => Err(FeedError::from(e)),
        };
    }
}
