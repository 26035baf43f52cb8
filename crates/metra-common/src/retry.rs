use std::future::Future;
use std::time::Duration;

/// Backoff schedule for a bounded retry loop.
///
/// Delays grow linearly: the sleep after the i-th failed attempt
/// (1-indexed) is `base_delay + step * i`. No sleep follows the final
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub step: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, base_delay: Duration, step: Duration) -> Self {
        Self {
            attempts,
            base_delay,
            step,
        }
    }

    /// Sleep applied after the given 1-indexed failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay + self.step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(2))
    }
}

/// Terminal failure after the policy's attempt budget is spent.
#[derive(Debug, thiserror::Error)]
#[error("after {attempts} attempts, last error: {last}")]
pub struct RetriesExhausted<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub attempts: u32,
    #[source]
    pub last: E,
}

/// Runs `op` until it succeeds or the attempt budget is spent.
///
/// At least one attempt is always made, even for a zero-attempt policy.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetriesExhausted<E>>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => last = Some(err),
        }
        if attempt < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(RetriesExhausted {
        attempts,
        last: last.expect("at least one attempt was made"),
    })
}

/// Blocking twin of [`retry`] for synchronous call sites.
pub fn retry_blocking<T, E, F>(policy: &RetryPolicy, mut op: F) -> Result<T, RetriesExhausted<E>>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts.max(1);
    let mut last = None;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => last = Some(err),
        }
        if attempt < attempts {
            std::thread::sleep(policy.delay_after(attempt));
        }
    }

    Err(RetriesExhausted {
        attempts,
        last: last.expect("at least one attempt was made"),
    })
}
