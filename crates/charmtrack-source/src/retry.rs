//! Exponential backoff retry for transient scrape-service errors.
//!
//! Non-retriable errors (parse failures, 404s) are propagated immediately
//! without retrying.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Returns `true` if `err` represents a transient condition worth retrying:
/// a 429 from the service or a network-level failure. Everything else
/// (404, unexpected status, deserialize failures) would fail the same way
/// again and is propagated immediately.
fn is_retriable(err: &SourceError) -> bool {
    matches!(err, SourceError::RateLimited { .. } | SourceError::Http(_))
}

/// Executes `operation` with exponential backoff on transient errors.
///
/// Sleeps `backoff_base_secs * 2^attempt` seconds between attempts, up to
/// `max_retries` additional attempts after the first try. The last error is
/// returned when retries are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                err
            }
        };

        // Cap the shift to prevent overflow on extreme configs.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient scrape-service error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, SourceError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SourceError::RateLimited {
                        retry_after_secs: 1,
                    })
                } else {
                    Ok(99u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_not_found() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::NotFound {
                    url: "http://example.com/listings".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::RateLimited {
                    retry_after_secs: 1,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(SourceError::RateLimited { .. })));
        // One initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
