//! Retry with backoff for run setup steps.

use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Delay before attempt `attempt + 1`: doubles from `base`, capped at 8x.
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.pow(attempt.saturating_sub(1).min(3))
}

/// Retry a task with exponential backoff.
///
/// Attempts the task up to `max_attempts` times (at least once), sleeping
/// [`backoff_delay`] between attempts. Returns the last error once attempts
/// are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut task_fn: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match task_fn().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= max_attempts => {
                error!("Task failed after {} attempts: {}", attempt, e);
                return Err(e);
            }
            Err(e) => {
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    "Task failed on attempt {}/{}: {}. Retrying in {:?}...",
                    attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 4), Duration::from_millis(800));
        assert_eq!(backoff_delay(base, 10), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_succeeds_on_second_attempt() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let task = || {
            let count = attempt_count_clone.clone();
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst) + 1;
                if current < 2 {
                    Err("Transient error")
                } else {
                    Ok("Success")
                }
            }
        };

        let result = retry_with_backoff(task, 3, Duration::from_secs(2)).await;

        assert_eq!(result, Ok("Success"));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_exhausts_attempts() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = attempt_count.clone();

        let task = || {
            let count = attempt_count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("Persistent error")
            }
        };

        let result = retry_with_backoff(task, 3, Duration::from_secs(2)).await;

        assert_eq!(result, Err("Persistent error"));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let attempt_count = AtomicU32::new(0);
        let result = retry_with_backoff(
            || async {
                attempt_count.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("nope")
            },
            0,
            Duration::ZERO,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }
}
