use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Capped exponential backoff plus up to 25% jitter so concurrent
    /// callers don't retry in lockstep.
    fn delay_for(&self, retry: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let jitter = capped.mul_f64(rand::thread_rng().gen_range(0.0..=0.25));
        capped + jitter
    }
}

/// Identifies the wrapped call in logs and in `RetryExhausted` errors.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub service: &'static str,
    pub operation: &'static str,
    pub user_id: String,
}

impl RetryContext {
    pub fn new(service: &'static str, operation: &'static str, user_id: &str) -> Self {
        Self {
            service,
            operation,
            user_id: user_id.to_string(),
        }
    }
}

/// Runs `op`, retrying up to `policy.max_retries` times with exponential
/// backoff. Sleeps are async so other in-flight work keeps running.
pub async fn retry_with_backoff<T, F, Fut>(
    ctx: &RetryContext,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    log::info!(
                        "{}.{} succeeded on attempt {} (user {})",
                        ctx.service,
                        ctx.operation,
                        attempt + 1,
                        ctx.user_id
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                log::warn!(
                    "{}.{} attempt {}/{} failed for user {}: {}",
                    ctx.service,
                    ctx.operation,
                    attempt + 1,
                    policy.max_retries + 1,
                    ctx.user_id,
                    e
                );
                last_err = Some(e);
            }
        }
    }

    Err(CoreError::RetryExhausted {
        service: ctx.service,
        operation: ctx.operation,
        user_id: ctx.user_id.clone(),
        source: last_err.unwrap_or_else(|| anyhow::anyhow!("no attempts executed")),
    })
}
