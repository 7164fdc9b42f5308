//! Retry with exponential back-off and jitter for page fetches.
//!
//! [`retry_with_backoff`] re-runs a fetch attempt while it fails with a
//! retriable [`FetchError`] (see [`FetchError::is_retriable`]). Blocks,
//! 4xx responses and malformed URLs are returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

const MAX_DELAY_MS: u64 = 30_000;

/// Delay before retry number `retry` (1-based): `base × 2^(retry-1)`, capped
/// at 30 s, then scaled by a ±25 % jitter factor.
pub(crate) fn backoff_delay(backoff_base: Duration, retry: u32) -> Duration {
    let base_ms = u64::try_from(backoff_base.as_millis()).unwrap_or(u64::MAX);
    let computed = base_ms.saturating_mul(1u64 << retry.saturating_sub(1).min(20));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(jittered)
}

/// Runs `operation` up to `max_attempts` times in total.
///
/// Back-off schedule with `backoff_base = 750ms`:
///
/// | Retry | Sleep before it              |
/// |-------|------------------------------|
/// | 1     | 750 ms × 2⁰ ± 25 % jitter    |
/// | 2     | 750 ms × 2¹ ± 25 % jitter    |
/// | 3     | 750 ms × 2² ± 25 % jitter    |
///
/// The last error is returned once attempts are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base: Duration,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = backoff_delay(backoff_base, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient fetch error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, Duration::ZERO, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, FetchError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, Duration::ZERO, || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(FetchError::Status { status: 503 })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), FetchError> = retry_with_backoff(3, Duration::ZERO, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Timeout { timeout_ms: 5 })
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), FetchError::Timeout { timeout_ms: 5 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_error_stops_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), FetchError> = retry_with_backoff(5, Duration::ZERO, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Status { status: 404 })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<(), FetchError> =
            retry_with_backoff(3, Duration::from_millis(100), || async {
                Err(FetchError::Transport("reset".to_owned()))
            })
            .await;
        // 100ms and 200ms nominal, each scaled by at least 0.75.
        assert!(start.elapsed() >= Duration::from_millis(225));
    }

    #[test]
    fn delay_is_capped() {
        let delay = backoff_delay(Duration::from_secs(10), 12);
        assert!(delay <= Duration::from_millis(MAX_DELAY_MS * 5 / 4));
    }

    #[test]
    fn zero_base_means_no_delay() {
        assert_eq!(backoff_delay(Duration::ZERO, 3), Duration::ZERO);
    }
}
