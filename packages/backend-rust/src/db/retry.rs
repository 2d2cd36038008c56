use std::future::Future;
use std::time::Duration;

use super::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries including the first one
    pub attempts: u32,
    /// Base delay; attempt n waits n * delay
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(50),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempts run out. Only [`StoreError::Unavailable`] is retried.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                tracing::warn!(operation, attempt, error = %err, "transient storage error, retrying");
                tokio::time::sleep(policy.delay * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
