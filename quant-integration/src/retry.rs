use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Parameters for [`retry_with_backoff`].
///
/// Replaces the source's `@retry_with_backoff` decorator (see the redesign notes): a plain
/// value struct plus a combinator function, rather than decorating every retryable call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub jitter_pct: f64,
}

impl Default for RetryPolicy {
    /// base=1.0s, factor=2.0, max_delay=60s, max_attempts=3, jitter=±50%, matching the
    /// Execution Engine's order-submission retry policy.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 3,
            jitter_pct: 0.5,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt as i32);
        let base_secs = self.base_delay.as_secs_f64() * exp;
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());

        let jitter_span = capped_secs * self.jitter_pct;
        let jittered = if jitter_span > 0.0 {
            rand::rng().random_range((capped_secs - jitter_span).max(0.0)..=(capped_secs + jitter_span))
        } else {
            capped_secs
        };
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Retry `op` up to `policy.max_attempts` times with exponential backoff and jitter, returning
/// the first success or the last error.
///
/// `is_retryable` classifies whether an error is worth retrying at all; permanent errors
/// (e.g. an order rejection) should return `false` so the caller gives up immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy { base_delay: Duration::from_millis(1), ..Default::default() };

        let result: Result<&str, &str> = retry_with_backoff(policy, |_| true, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("transient") } else { Ok("done") } }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_on_permanent_error() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy { base_delay: Duration::from_millis(1), ..Default::default() };

        let result: Result<&str, &str> = retry_with_backoff(policy, |_| false, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err("permanent") }
        })
        .await;

        assert_eq!(result, Err("permanent"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_attempts: 3,
            ..Default::default()
        };

        let result: Result<&str, &str> = retry_with_backoff(policy, |_| true, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err("still failing") }
        })
        .await;

        assert_eq!(result, Err("still failing"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
