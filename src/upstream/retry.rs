//! Transport-level retry with exponential backoff
//!
//! Only transient failures are retried (see [`UpstreamError::is_retryable`]).
//! A model that answers with garbage is not a transport failure; the
//! pipeline handles that with a re-prompt instead.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// Default maximum number of attempts (including the first)
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default base backoff in milliseconds (doubles each retry)
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
/// Maximum backoff duration in milliseconds (30 seconds)
///
/// Prevents overflow from the exponential. With base=500ms:
/// - Attempt 6 would be 16 seconds (under cap)
/// - Attempt 7 would be 32 seconds (capped to 30s)
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// How many times to try, and how long to wait in between
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (must be at least 1)
    max_attempts: usize,
    /// Base backoff in milliseconds (doubles each retry)
    retry_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Errors
    /// Returns an error if `max_attempts` is 0 (at least 1 attempt is required)
    pub fn new(max_attempts: usize, retry_backoff_ms: u64) -> Result<Self, &'static str> {
        if max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        Ok(Self {
            max_attempts,
            retry_backoff_ms,
        })
    }

    /// Get the maximum number of attempts
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Get the base backoff in milliseconds
    pub fn retry_backoff_ms(&self) -> u64 {
        self.retry_backoff_ms
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

/// Calculate exponential backoff with overflow protection
///
/// The formula is `base * 2^(attempt-1)`, capped at [`MAX_BACKOFF_MS`].
/// `attempt` is the 1-indexed attempt that just failed.
///
/// With base=500ms:
/// - Attempt 1: 500ms
/// - Attempt 2: 1,000ms
/// - Attempt 3: 2,000ms
pub fn calculate_backoff(policy: &RetryPolicy, attempt: usize) -> u64 {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    policy
        .retry_backoff_ms
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(MAX_BACKOFF_MS)
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out
///
/// `operation` receives the 1-indexed attempt number. Exhausting the
/// attempts yields [`UpstreamError::Exhausted`] wrapping the last failure;
/// a non-retryable failure is returned as-is immediately.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, UpstreamError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                tracing::warn!(
                    attempt = attempt,
                    error = %e,
                    "Upstream request failed with a non-retryable error"
                );
                return Err(e);
            }
            Err(e) if attempt >= policy.max_attempts() => {
                tracing::error!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts(),
                    error = %e,
                    "All upstream attempts exhausted"
                );
                return Err(UpstreamError::Exhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                let backoff_ms = calculate_backoff(policy, attempt);
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts(),
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Upstream request failed, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}
