//! Rate limiting and retries shared by every HTTP adapter.

use std::future::Future;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rate_limit::RateLimiter;
use crate::retry::{run_attempt, with_retry, RetryPolicy};

/// Rate limiting plus retry for a single named service.
///
/// Every attempt, retries included, passes through the limiter before it is
/// issued; the per-attempt timeout starts only once the attempt is admitted,
/// so time spent queueing never counts against it.
#[derive(Debug, Clone)]
pub struct ResilientCaller {
    service: &'static str,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl ResilientCaller {
    #[must_use]
    pub fn new(service: &'static str, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            service,
            limiter,
            policy,
        }
    }

    /// A caller with no throttling, handy for tests and local mirrors.
    #[must_use]
    pub fn unthrottled(service: &'static str, policy: RetryPolicy) -> Self {
        Self::new(service, Arc::new(RateLimiter::unlimited()), policy)
    }

    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` with limiter admission and retry.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error once it is non-retriable or retries
    /// are exhausted.
    pub async fn call<T, F, Fut>(&self, mut operation: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let service = self.service;
        let limiter = &self.limiter;
        let budget = self.policy.attempt_timeout;
        let policy = RetryPolicy {
            attempt_timeout: None,
            ..self.policy.clone()
        };
        with_retry(&policy, service, || {
            let attempt = operation();
            async move {
                limiter.acquire().await;
                run_attempt(service, budget, attempt).await
            }
        })
        .await
    }
}
