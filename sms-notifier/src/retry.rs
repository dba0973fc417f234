//! Capped exponential backoff for remote calls
//!
//! Every call against the remote attribute store (ledger reads/writes, template
//! metafield reads/writes) goes through [`with_backoff`]. The caller decides which
//! errors are worth retrying; everything else fails on the first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempt ceiling for remote store calls
pub const REMOTE_MAX_ATTEMPTS: u32 = 3;
/// First retry delay
pub const REMOTE_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Upper bound for a single retry delay
pub const REMOTE_MAX_DELAY: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay after the given failed attempt (1-based): `min(base * 2^(attempt-1), cap)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(REMOTE_MAX_ATTEMPTS, REMOTE_BASE_DELAY, REMOTE_MAX_DELAY)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the attempt
/// ceiling is reached. The last error is returned unchanged.
pub async fn with_backoff<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    operation: &'static str,
    is_retryable: P,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let will_retry = attempt < max_attempts && is_retryable(&e);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    will_retry,
                    "Remote call failed: {e}"
                );
                if !will_retry {
                    if attempt > 1 {
                        tracing::error!(operation, attempts = attempt, "Giving up after retries");
                    }
                    return Err(e);
                }

                tokio::time::sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}
