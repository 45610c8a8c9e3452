//! Exponential backoff without jitter.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Total time budget across all attempts, including waits. Zero means no limit.
    pub max_elapsed_time: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Duration::from_secs(15 * 60),
        }
    }
}

impl ExponentialBackoff {
    /// Wait before the next attempt after `failures` consecutive failures.
    pub fn interval_for(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_interval.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_interval)
    }
}

/// Run `operation` until it succeeds or the elapsed time budget is spent.
///
/// After each failure `notify` receives the error and the wait before the
/// next attempt. A failure observed once `max_elapsed_time` has passed is
/// returned as is.
pub async fn retry_notify<T, E, F, Fut, N>(
    backoff: &ExponentialBackoff,
    mut operation: F,
    mut notify: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(&E, Duration),
{
    let start = Instant::now();
    let mut failures: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !backoff.max_elapsed_time.is_zero()
                    && start.elapsed() >= backoff.max_elapsed_time
                {
                    return Err(err);
                }
                failures = failures.saturating_add(1);
                let wait = backoff.interval_for(failures);
                notify(&err, wait);
                sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(max_elapsed_secs: u64) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(5),
            max_elapsed_time: Duration::from_secs(max_elapsed_secs),
        }
    }

    #[test]
    fn test_interval_growth_and_cap() {
        let b = backoff(60);
        assert_eq!(b.interval_for(1), Duration::from_secs(1));
        assert_eq!(b.interval_for(2), Duration::from_secs(2));
        assert_eq!(b.interval_for(3), Duration::from_secs(4));
        assert_eq!(b.interval_for(4), Duration::from_secs(5));
        assert_eq!(b.interval_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_default_intervals() {
        let b = ExponentialBackoff::default();
        assert_eq!(b.interval_for(1), Duration::from_secs(1));
        assert_eq!(b.interval_for(2), Duration::from_millis(1500));
        assert_eq!(b.interval_for(100), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let mut calls = 0u32;
        let mut notified = Vec::new();

        let result: Result<u32, String> = retry_notify(
            &backoff(60),
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt <= 3 {
                        Err(format!("attempt {attempt} failed"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |err, wait| notified.push((err.clone(), wait)),
        )
        .await;

        assert_eq!(result, Ok(4));
        assert_eq!(notified.len(), 3);
        assert_eq!(
            notified.iter().map(|(_, w)| *w).collect::<Vec<_>>(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_notify() {
        let mut notified = 0;
        let result: Result<&str, ()> =
            retry_notify(&backoff(60), || async { Ok("ok") }, |_, _| notified += 1).await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(notified, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let start = Instant::now();
        let mut calls = 0u32;
        let mut notified = 0;

        // Failures at 0s, 1s, 3s and 7s retry; the one at 12s is past the 10s budget.
        let result: Result<(), u32> = retry_notify(
            &backoff(10),
            || {
                calls += 1;
                let attempt = calls;
                async move { Err(attempt) }
            },
            |_, _| notified += 1,
        )
        .await;

        assert_eq!(result, Err(5));
        assert_eq!(notified, 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed <= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_is_used_up() {
        let start = Instant::now();
        let b = ExponentialBackoff::default();

        let result: Result<(), ()> = retry_notify(&b, || async { Err(()) }, |_, _| {}).await;

        assert_eq!(result, Err(()));
        assert!(start.elapsed() >= b.max_elapsed_time);
        assert!(start.elapsed() <= b.max_elapsed_time + b.max_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_retries_without_limit() {
        let mut calls = 0u32;
        let unlimited = backoff(0);

        let result: Result<u32, &str> = retry_notify(
            &unlimited,
            || {
                calls += 1;
                let attempt = calls;
                async move { if attempt < 3 { Err("down") } else { Ok(attempt) } }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result, Ok(3));
    }
}
