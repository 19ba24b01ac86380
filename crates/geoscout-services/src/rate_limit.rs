//! Client-side request throttling.
//!
//! A [`RateLimiter`] enforces two independent constraints per service: a
//! minimum spacing between consecutive admissions, and a cap on admissions
//! inside a sliding window. Waiters queue on a fair `tokio::sync::Mutex`, so
//! they are admitted in arrival order.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Throttling limits for one service. A zero `min_interval` or a zero
/// `max_requests` disables the corresponding constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub min_interval: Duration,
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            min_interval: Duration::ZERO,
            max_requests: 0,
            window: Duration::ZERO,
        }
    }

    /// At most one request every `interval`.
    #[must_use]
    pub fn min_interval(interval: Duration) -> Self {
        Self {
            min_interval: interval,
            ..Self::unlimited()
        }
    }

    /// At most `requests` inside any rolling `window`.
    #[must_use]
    pub fn per_window(requests: usize, window: Duration) -> Self {
        Self {
            max_requests: requests,
            window,
            ..Self::unlimited()
        }
    }

    /// At most `requests` per rolling minute.
    #[must_use]
    pub fn per_minute(requests: u32) -> Self {
        Self::per_window(requests as usize, Duration::from_secs(60))
    }

    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    last_admitted: Option<Instant>,
    history: VecDeque<Instant>,
}

impl LimiterState {
    /// How long a request arriving at `now` must wait. Prunes window entries
    /// that have aged out.
    fn wait_needed(&mut self, config: &RateLimitConfig, now: Instant) -> Duration {
        let mut wait = Duration::ZERO;

        if let Some(last) = self.last_admitted {
            let ready_at = last + config.min_interval;
            wait = wait.max(ready_at.saturating_duration_since(now));
        }

        if config.max_requests > 0 {
            while self
                .history
                .front()
                .is_some_and(|t| now.saturating_duration_since(*t) >= config.window)
            {
                self.history.pop_front();
            }
            if self.history.len() >= config.max_requests {
                if let Some(oldest) = self.history.front() {
                    let frees_at = *oldest + config.window;
                    wait = wait.max(frees_at.saturating_duration_since(now));
                }
            }
        }

        wait
    }

    fn admit(&mut self, config: &RateLimitConfig, now: Instant) {
        self.last_admitted = Some(now);
        if config.max_requests > 0 {
            self.history.push_back(now);
        }
    }
}

/// Shared throttle for one external service.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(RateLimitConfig::unlimited())
    }

    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits until a request may be issued, then records the admission.
    ///
    /// The lock is held across the sleep so later callers queue behind the
    /// current one instead of racing for the same slot.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        loop {
            let now = Instant::now();
            let wait = state.wait_needed(&self.config, now);
            if wait.is_zero() {
                state.admit(&self.config, now);
                return;
            }
            tracing::debug!(
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "rate limiter delaying request"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TOLERANCE: Duration = Duration::from_millis(2);

    #[test]
    fn window_prunes_expired_admissions() {
        let config = RateLimitConfig::per_window(2, Duration::from_millis(100));
        let mut state = LimiterState::default();
        let start = Instant::now();
        state.admit(&config, start);
        state.admit(&config, start + Duration::from_millis(10));

        let blocked = state.wait_needed(&config, start + Duration::from_millis(50));
        assert_eq!(blocked, Duration::from_millis(50));

        let later = start + Duration::from_millis(105);
        assert_eq!(state.wait_needed(&config, later), Duration::ZERO);
        assert_eq!(state.history.len(), 1, "first admission aged out");
    }

    #[test]
    fn unlimited_never_waits() {
        let config = RateLimitConfig::unlimited();
        let mut state = LimiterState::default();
        let now = Instant::now();
        for _ in 0..50 {
            assert_eq!(state.wait_needed(&config, now), Duration::ZERO);
            state.admit(&config, now);
        }
        assert!(state.history.is_empty());
    }

    #[tokio::test]
    async fn sequential_calls_respect_min_interval() {
        let interval = Duration::from_millis(40);
        let limiter = RateLimiter::new(RateLimitConfig::min_interval(interval));
        let mut admitted = Vec::new();
        for _ in 0..4 {
            limiter.acquire().await;
            admitted.push(Instant::now());
        }
        for pair in admitted.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap + TOLERANCE >= interval, "gap {gap:?} < {interval:?}");
        }
    }

    #[tokio::test]
    async fn window_cap_delays_overflow_request() {
        let window = Duration::from_millis(150);
        let limiter = RateLimiter::new(RateLimitConfig::per_window(2, window));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < window, "first two fit in the window");
        limiter.acquire().await;
        assert!(start.elapsed() + TOLERANCE >= window);
    }

    #[tokio::test]
    async fn concurrent_callers_are_spaced() {
        let interval = Duration::from_millis(30);
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::min_interval(interval)));
        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();
        for pair in admitted.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap + TOLERANCE >= interval, "gap {gap:?} < {interval:?}");
        }
    }
}
