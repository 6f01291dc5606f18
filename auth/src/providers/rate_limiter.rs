//! Rate limiter trait for incoming requests.
//!
//! Requests are counted per client key (normally the client IP) in a sliding
//! window. The limiter reports the decision and never rejects on its own;
//! the caller decides what a denial means.

use crate::error::Result;
use serde::Serialize;

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the request fits in the window.
    pub success: bool,
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Unix milliseconds at which the window frees a slot.
    pub reset: u64,
}

/// Sliding-window request limiter.
///
/// # Example
///
/// ```ignore
/// let decision = limiter.limit("203.0.113.7").await?;
/// if !decision.success {
///     // reply 429
/// }
/// ```
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key` and report whether it is allowed.
    ///
    /// Denied requests do not consume a slot.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RateLimiter`](crate::AuthError::RateLimiter) if
    /// the backing store fails.
    fn limit(&self, key: &str) -> impl Future<Output = Result<RateLimitDecision>> + Send;
}
