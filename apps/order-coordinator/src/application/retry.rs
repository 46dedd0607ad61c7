//! Retry policy with exponential backoff for gateway requests.
//!
//! Only transient transport failures are retried. Business-rule failures are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::ports::GatewayError;

/// Retry policy configuration for gateway requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth.
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default multiplier and jitter.
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
            ..Self::default()
        }
    }

    /// A single attempt with no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Backoff before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1).min(16) as i32);
        let base_ms = self.initial_backoff.as_millis() as f64 * exp;
        let capped_ms = base_ms.min(self.max_backoff.as_millis() as f64);
        if capped_ms <= 0.0 {
            return Duration::ZERO;
        }
        let jitter_range = capped_ms * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::rng().random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((capped_ms + jitter).max(1.0) as u64)
    }
}

/// Failure of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    /// The last error observed.
    pub last_error: GatewayError,
    /// Attempts made.
    pub attempts: u32,
    /// Whether any attempt may have reached the gateway.
    pub possibly_delivered: bool,
}

/// Run `op` until it succeeds, fails permanently, or attempts are exhausted.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut possibly_delivered = false;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                possibly_delivered |= err.possibly_delivered();
                if !err.is_retryable() || attempt >= policy.max_attempts {
                    return Err(RetryFailure {
                        last_error: err,
                        attempts: attempt,
                        possibly_delivered,
                    });
                }
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Gateway request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350))
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(4), Duration::from_millis(350));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(10));
        let result = with_retry(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GatewayError::Transient("reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(10));
        let result: Result<(), _> = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::Rejected("lot size".into())) }
        })
        .await;
        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(!failure.possibly_delivered);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_timeouts_are_possibly_delivered() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(10));
        let result: Result<(), _> = with_retry(&policy, "test", || async {
            Err(GatewayError::Timeout(Duration::from_secs(1)))
        })
        .await;
        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert!(failure.possibly_delivered);
    }
}
