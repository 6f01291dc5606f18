//! Redis-based rate limiter implementation.
//!
//! # Algorithm
//!
//! Sliding window with sorted sets, in one atomic pipeline:
//! 1. Remove entries older than the window (ZREMRANGEBYSCORE)
//! 2. Count what is left (ZCARD) and fetch the oldest entry (ZRANGE)
//! 3. Record this request (ZADD) and refresh the key TTL (PEXPIRE)
//!
//! A denied request is removed again so it does not hold a slot.

use crate::error::{AuthError, Result};
use crate::providers::{RateLimitDecision, RateLimiter};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `Redis`-based rate limiter using a sliding window.
///
/// # Example
///
/// ```no_run
/// use todolist_auth::stores::RedisRateLimiter;
/// use todolist_auth::providers::RateLimiter;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter =
///     RedisRateLimiter::new("redis://127.0.0.1:6379", Some("token"), 10, Duration::from_secs(10))
///         .await?;
///
/// let decision = limiter.limit("203.0.113.7").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisRateLimiter {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    max_requests: u32,
    window: Duration,
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RedisRateLimiter {
    /// Connect to `redis_url`, authenticating with `token` when given.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn new(
        redis_url: &str,
        token: Option<&str>,
        max_requests: u32,
        window: Duration,
    ) -> Result<Self> {
        let mut info = redis_url
            .into_connection_info()
            .map_err(|e| AuthError::RateLimiter(format!("Invalid Redis URL: {e}")))?;
        if let Some(token) = token {
            info.redis.password = Some(token.to_string());
        }

        let client = Client::open(info)
            .map_err(|e| AuthError::RateLimiter(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::RateLimiter(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self {
            conn_manager,
            max_requests,
            window,
        })
    }

    /// Get the `Redis` key for rate limiting.
    fn rate_limit_key(key: &str) -> String {
        format!("ratelimit:{key}")
    }

    /// Get current timestamp in milliseconds.
    #[allow(clippy::cast_possible_truncation)] // Safe: timestamps fit in u64 until year 584,554,531
    fn current_timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    #[allow(clippy::cast_possible_truncation)] // Safe: rate limit windows are small durations
    fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

impl RateLimiter for RedisRateLimiter {
    async fn limit(&self, key: &str) -> Result<RateLimitDecision> {
        let mut conn = self.conn_manager.clone();
        let rate_key = Self::rate_limit_key(key);
        let now_ms = Self::current_timestamp_ms();
        let window_ms = self.window_ms();
        let window_start = now_ms.saturating_sub(window_ms);
        let member = format!("{now_ms}-{}", uuid::Uuid::new_v4());

        #[allow(clippy::cast_possible_wrap)] // Safe: window_ms is small
        let (count, oldest): (u64, Vec<(String, f64)>) = redis::pipe()
            .atomic()
            .zrembyscore(&rate_key, 0, window_start)
            .ignore()
            .zcard(&rate_key)
            .zrange_withscores(&rate_key, 0, 0)
            .zadd(&rate_key, &member, now_ms)
            .ignore()
            .pexpire(&rate_key, window_ms as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        let limit = self.max_requests;
        let success = count < u64::from(limit);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Scores are ms timestamps
        let window_opened = oldest.first().map_or(now_ms, |(_, score)| *score as u64);
        let reset = window_opened + window_ms;

        if !success {
            let _: () = conn.zrem(&rate_key, &member).await?;
            tracing::warn!(
                rate_limit_exceeded = true,
                key = %key,
                count = count,
                limit = limit,
                window_ms = window_ms,
                "Rate limit exceeded"
            );
            return Ok(RateLimitDecision {
                success,
                limit,
                remaining: 0,
                reset,
            });
        }

        #[allow(clippy::cast_possible_truncation)] // count < limit <= u32::MAX
        let remaining = limit - count as u32 - 1;

        tracing::debug!(key = %key, remaining = remaining, "Rate limit check passed");

        Ok(RateLimitDecision {
            success,
            limit,
            remaining,
            reset,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(
            RedisRateLimiter::rate_limit_key("127.0.0.1"),
            "ratelimit:127.0.0.1"
        );
    }

    #[tokio::test]
    #[ignore = "requires Redis at 127.0.0.1:6379"]
    async fn sliding_window_against_redis() {
        let limiter =
            RedisRateLimiter::new("redis://127.0.0.1:6379", None, 2, Duration::from_secs(5))
                .await
                .unwrap();
        let key = format!("test-{}", uuid::Uuid::new_v4());

        let first = limiter.limit(&key).await.unwrap();
        assert!(first.success);
        assert_eq!(first.remaining, 1);

        assert!(limiter.limit(&key).await.unwrap().success);

        let third = limiter.limit(&key).await.unwrap();
        assert!(!third.success);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset, first.reset);
    }
}
