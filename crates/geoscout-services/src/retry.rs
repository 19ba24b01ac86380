//! Retry with exponential back-off and jitter for external service calls.
//!
//! [`with_retry`] wraps any fallible async operation and retries while the
//! error is transient (see [`ServiceError::is_retriable`]). [`with_retry_if`]
//! takes a caller-supplied predicate and an observer invoked before each
//! back-off sleep.

use std::future::Future;
use std::time::Duration;

use crate::error::ServiceError;

/// Back-off schedule and per-attempt time budget.
///
/// The delay before retry `n` (1-based) is
/// `min(max_delay, initial_delay × multiplier^(n-1))`, scaled by a random
/// factor in `[0.75, 1.25]` when `jitter` is set. A `Retry-After` hint on a
/// 429 raises the delay to at least that many seconds, still capped at
/// `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
    /// Budget for a single attempt; exceeding it yields [`ServiceError::Timeout`].
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(20)),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Unjittered delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Actual sleep before retry `attempt` after `err`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, err: &ServiceError) -> Duration {
        let mut delay = self.base_delay(attempt);
        if self.jitter {
            delay = delay.mul_f64(rand::random::<f64>() * 0.5 + 0.75);
        }
        if let ServiceError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = err
        {
            let hinted = Duration::from_secs(*secs).min(self.max_delay);
            delay = delay.max(hinted);
        }
        delay
    }
}

/// Details handed to the retry observer before each back-off sleep.
#[derive(Debug)]
pub struct RetryAttempt<'a> {
    /// 1-based retry number.
    pub attempt: u32,
    pub delay: Duration,
    pub error: &'a ServiceError,
}

/// Runs `operation` under `policy`, retrying on [`ServiceError::is_retriable`].
///
/// # Errors
///
/// Returns the first non-retriable error, or the last error once
/// `policy.max_retries` retries have been spent.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    service: &'static str,
    operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    with_retry_if(policy, service, ServiceError::is_retriable, |_| {}, operation).await
}

/// Like [`with_retry`], with a custom retry predicate and a per-retry observer.
///
/// The operation runs at most `policy.max_retries + 1` times. Errors rejected
/// by `should_retry` are returned at once, without any delay.
///
/// # Errors
///
/// Returns the first error `should_retry` rejects, or the last error once the
/// retries are exhausted.
pub async fn with_retry_if<T, F, Fut, P, O>(
    policy: &RetryPolicy,
    service: &'static str,
    should_retry: P,
    mut on_retry: O,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
    P: Fn(&ServiceError) -> bool,
    O: FnMut(&RetryAttempt<'_>),
{
    let mut attempt = 0u32;
    loop {
        match run_attempt(service, policy.attempt_timeout, operation()).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !should_retry(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt, &err);
                on_retry(&RetryAttempt {
                    attempt,
                    delay,
                    error: &err,
                });
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    service,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient service error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Awaits one attempt, converting an exceeded budget into [`ServiceError::Timeout`].
pub(crate) async fn run_attempt<T, Fut>(
    service: &'static str,
    budget: Option<Duration>,
    attempt: Fut,
) -> Result<T, ServiceError>
where
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let Some(limit) = budget else {
        return attempt.await;
    };
    #[allow(clippy::cast_possible_truncation)]
    let elapsed_ms = limit.as_millis() as u64;
    tokio::time::timeout(limit, attempt)
        .await
        .unwrap_or_else(|_| {
            Err(ServiceError::Timeout {
                service,
                elapsed_ms,
            })
        })
}
