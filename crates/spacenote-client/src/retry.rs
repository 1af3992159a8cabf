//! Bounded retry for read requests.
//!
//! Only server and network failures are retried; everything the client did
//! wrong (auth, validation, not found) fails immediately.

use std::future::Future;
use std::time::Duration;

use spacenote_core::{defaults, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::QUERY_MAX_RETRIES,
            base_delay: Duration::from_millis(defaults::QUERY_RETRY_BASE_MS),
            max_delay: Duration::from_millis(defaults::QUERY_RETRY_MAX_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// `min(base * 2^attempt, max)`, with `attempt` counted from zero.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    pub fn is_retryable(error: &Error) -> bool {
        matches!(error, Error::Server(_) | Error::Network(_))
    }

    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt < self.max_retries && Self::is_retryable(error)
    }

    /// Run `op` until it succeeds, fails for good, or retries run out.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        subsystem = "client",
                        component = "retry",
                        op = op_name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_progression() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(10_000));
    }

    #[test]
    fn test_only_server_and_network_errors_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&Error::Server("boom".into()), 0));
        assert!(policy.should_retry(&Error::Network("reset".into()), 2));
        assert!(!policy.should_retry(&Error::Network("reset".into()), 3));
        assert!(!policy.should_retry(&Error::Unauthorized("x".into()), 0));
        assert!(!policy.should_retry(&Error::Validation("x".into()), 0));
        assert!(!policy.should_retry(&Error::NotFound("x".into()), 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = RetryPolicy::default()
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Server("busy".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = RetryPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("down".into()))
            })
            .await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_client_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = RetryPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Forbidden("no".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
