//! Single-purpose retry helper for listing pages.
//!
//! Enumeration is the one place a transient failure is retried: a failed
//! page fetch may be re-issued while partial results already consumed are
//! kept. Capability probes are never retried.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Configuration for page-fetch retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries before giving up.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    pub max_backoff_ms: u64,
    /// Whether to add jitter to backoff times.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Backoff duration for a given attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff_ms * 2u64.pow(attempt);
        let capped_ms = base_ms.min(self.max_backoff_ms);

        let final_ms = if self.jitter {
            let jitter_range = capped_ms / 4;
            let jitter = rand::rng().random_range(0..=jitter_range);
            capped_ms.saturating_add(jitter)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }
}

/// Whether an error is worth retrying. Authorization and existence failures
/// are definitive; throttling and connectivity failures are not.
pub fn is_retryable(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("accessdenied")
        || error_lower.contains("nosuchbucket")
        || error_lower.contains("nosuchkey")
        || error_lower.contains("403")
        || error_lower.contains("404")
    {
        return false;
    }

    true
}

/// Execute an async operation, retrying transient failures with backoff.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut last_error: Option<E> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e.to_string()) {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %e,
                        "Non-retryable error"
                    );
                    return Err(e);
                }

                if attempt < config.max_retries {
                    let backoff = config.backoff_duration(attempt);
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis(),
                        "Retryable error, backing off"
                    );
                    sleep(backoff).await;
                }

                last_error = Some(e);
            }
        }
    }

    Err(last_error.expect("should have last error after all retries"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig {
            initial_backoff_ms: 100,
            max_backoff_ms: 300,
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.backoff_duration(0), Duration::from_millis(100));
        assert_eq!(config.backoff_duration(1), Duration::from_millis(200));
        assert_eq!(config.backoff_duration(2), Duration::from_millis(300));
        assert_eq!(config.backoff_duration(5), Duration::from_millis(300));
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable("connection reset by peer"));
        assert!(is_retryable("SlowDown: reduce request rate"));
        assert!(!is_retryable("AccessDenied: permission denied"));
        assert!(!is_retryable("NoSuchBucket"));
        assert!(!is_retryable("404 Not Found"));
    }

    #[tokio::test]
    async fn test_with_retry_success_first_try() {
        let config = RetryConfig::default();
        let mut calls = 0;

        let result: Result<i32, &str> = with_retry(&config, "test_op", || {
            calls += 1;
            async { Ok(7) }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_with_retry_transient_then_success() {
        let config = RetryConfig {
            initial_backoff_ms: 1,
            jitter: false,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<i32, String> = with_retry(&config, "test_op", || {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("connection reset".to_string())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_definitive_error_fails_fast() {
        let config = RetryConfig::default();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<i32, String> = with_retry(&config, "test_op", || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Err("AccessDenied".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
