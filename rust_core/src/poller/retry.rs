//! Bounded retry for outbound price fetches.
//!
//! Each attempt is wrapped in a timeout; between failed attempts the wait
//! grows linearly (`base + attempt * step`). No wait follows the last attempt.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub step: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            step: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay + self.step * attempt
    }
}

/// Run `f` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Timeouts count as failures. The last error is returned on exhaustion.
pub async fn execute_with_retry<F, Fut, T>(policy: &RetryPolicy, what: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.attempt_timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("timed out after {:?}", policy.attempt_timeout)),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what, attempt, max_attempts, e, backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, max_attempts, e);
                return Err(e.context(format!("{} failed after {} attempts", what, attempt)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            step: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(3));
        assert_eq!(policy.backoff(2), Duration::from_secs(5));
        assert_eq!(policy.backoff(3), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let result: Result<i32> = execute_with_retry(&instant_policy(3), "fetch", || {
            let count = attempt_count_clone.clone();
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst) + 1;
                if current < 3 {
                    Err(anyhow!("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_fails_after_max_attempts() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let result: Result<i32> = execute_with_retry(&instant_policy(4), "fetch", || {
            let count = attempt_count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("HTTP 503"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_hung_attempt_times_out() {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(50),
            ..instant_policy(2)
        };

        let result: Result<()> = execute_with_retry(&policy, "fetch", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("timed out"));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let c = attempt_count.clone();
        let _ = execute_with_retry(&instant_policy(0), "fetch", || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            }
        })
        .await;
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }
}
