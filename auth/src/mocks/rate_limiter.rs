//! Mock rate limiter for testing.

use crate::error::{AuthError, Result};
use crate::providers::{RateLimitDecision, RateLimiter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
enum Mode {
    SlidingWindow { limit: u32, window_ms: u64 },
    Fixed(RateLimitDecision),
    Failing(String),
}

/// In-memory rate limiter for testing.
///
/// Either counts requests in a real sliding window, answers every call with
/// a fixed decision, or fails every call. Every key it sees is recorded.
///
/// ```
/// # use todolist_auth::mocks::MockRateLimiter;
/// # use todolist_auth::providers::RateLimiter;
/// # use std::time::Duration;
/// # async fn example() {
/// let limiter = MockRateLimiter::new(1, Duration::from_secs(10));
/// assert!(limiter.limit("1.2.3.4").await.unwrap().success);
/// assert!(!limiter.limit("1.2.3.4").await.unwrap().success);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockRateLimiter {
    mode: Mode,
    /// Map of key -> Vec<timestamp_ms>
    attempts: Arc<Mutex<HashMap<String, Vec<u64>>>>,
    keys: Arc<Mutex<Vec<String>>>,
}

impl MockRateLimiter {
    /// Sliding window of `limit` requests per `window`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Safe: test windows are small durations
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_mode(Mode::SlidingWindow {
            limit,
            window_ms: window.as_millis() as u64,
        })
    }

    /// Answer every call with `decision`.
    #[must_use]
    pub fn with_decision(decision: RateLimitDecision) -> Self {
        Self::with_mode(Mode::Fixed(decision))
    }

    /// Fail every call with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_mode(Mode::Failing(message.into()))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            attempts: Arc::new(Mutex::new(HashMap::new())),
            keys: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Keys passed to [`limit`](RateLimiter::limit), in call order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().map(|keys| keys.clone()).unwrap_or_default()
    }

    /// Get current timestamp in milliseconds.
    #[allow(clippy::cast_possible_truncation)]
    fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    fn slide(&self, key: &str, limit: u32, window_ms: u64) -> Result<RateLimitDecision> {
        let mut attempts_guard = self
            .attempts
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))?;

        let now_ms = Self::current_timestamp_ms();
        let window_start = now_ms.saturating_sub(window_ms);

        let timestamps = attempts_guard.entry(key.to_string()).or_default();
        timestamps.retain(|&ts| ts > window_start);

        let reset = timestamps.first().copied().unwrap_or(now_ms) + window_ms;

        #[allow(clippy::cast_possible_truncation)]
        let used = timestamps.len() as u32;
        if used >= limit {
            tracing::warn!(key = %key, limit = limit, "Mock rate limit exceeded");
            return Ok(RateLimitDecision {
                success: false,
                limit,
                remaining: 0,
                reset,
            });
        }

        timestamps.push(now_ms);
        Ok(RateLimitDecision {
            success: true,
            limit,
            remaining: limit - used - 1,
            reset,
        })
    }
}

impl RateLimiter for MockRateLimiter {
    async fn limit(&self, key: &str) -> Result<RateLimitDecision> {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push(key.to_string());
        }

        match &self.mode {
            Mode::SlidingWindow { limit, window_ms } => self.slide(key, *limit, *window_ms),
            Mode::Fixed(decision) => Ok(*decision),
            Mode::Failing(message) => Err(AuthError::RateLimiter(message.clone())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sliding_window_counts_down_then_denies() {
        let limiter = MockRateLimiter::new(2, Duration::from_secs(60));

        let first = limiter.limit("a").await.unwrap();
        assert_eq!((first.success, first.remaining, first.limit), (true, 1, 2));

        let second = limiter.limit("a").await.unwrap();
        assert_eq!((second.success, second.remaining), (true, 0));

        let third = limiter.limit("a").await.unwrap();
        assert!(!third.success);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset, first.reset);
    }

    #[tokio::test]
    async fn keys_are_counted_separately() {
        let limiter = MockRateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.limit("a").await.unwrap().success);
        assert!(limiter.limit("b").await.unwrap().success);
        assert!(!limiter.limit("a").await.unwrap().success);
        assert_eq!(limiter.keys(), ["a", "b", "a"]);
    }

    #[tokio::test]
    async fn fixed_and_failing_modes() {
        let decision = RateLimitDecision {
            success: false,
            limit: 10,
            remaining: 0,
            reset: 1_700_000_000,
        };
        let fixed = MockRateLimiter::with_decision(decision);
        assert_eq!(fixed.limit("x").await.unwrap(), decision);

        let failing = MockRateLimiter::failing("redis down");
        assert_eq!(
            failing.limit("x").await.unwrap_err(),
            AuthError::RateLimiter("redis down".into())
        );
    }
}
