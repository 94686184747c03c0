//! Retry logic with exponential backoff for network operations

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, backoff::Backoff};
use std::time::Duration;
use tracing::{debug, warn};

use crate::Result;
use crate::config::RetryConfig;

/// Retry a fallible async operation with exponential backoff.
///
/// Only errors for which [`Error::is_transient`](crate::Error::is_transient)
/// holds are retried; the last error is returned once attempts run out.
/// The operation must be idempotent.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = create_backoff(config);
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match f().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempts,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    debug!(
                        operation = operation_name,
                        error = %err,
                        "Error is not retryable, failing immediately"
                    );
                    return Err(err);
                }

                if attempts >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempts,
                        error = %err,
                        "Operation failed after maximum retries"
                    );
                    return Err(err);
                }

                let Some(duration) = backoff.next_backoff() else {
                    return Err(err);
                };
                warn!(
                    operation = operation_name,
                    attempts = attempts,
                    error = %err,
                    retry_in_ms = duration.as_millis(),
                    "Operation failed, retrying"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}

/// Create exponential backoff from config
fn create_backoff(config: &RetryConfig) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
        .with_max_interval(Duration::from_millis(config.max_backoff_ms))
        .with_multiplier(config.backoff_multiplier)
        .with_max_elapsed_time(None) // We use max_attempts instead
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff_ms: 5,
            max_backoff_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result = retry_with_backoff(&fast_config(3), "test", move || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failure() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result = retry_with_backoff(&fast_config(3), "test", move || {
            let cc = cc.clone();
            async move {
                let count = cc.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(Error::http_status("http://x", 502))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result = retry_with_backoff(&fast_config(2), "test", move || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::network("http://x", "connection refused"))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Network { .. })));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let result = retry_with_backoff(&fast_config(5), "test", move || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::http_status("http://x", 404))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = call_count.clone();

        let _ = retry_with_backoff(&fast_config(0), "test", move || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::network("http://x", "down"))
            }
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
