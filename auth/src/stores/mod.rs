//! Storage-backed provider implementations.
//!
//! - **Session file** - JSON document on local disk, replaced atomically
//! - **Rate limiter** (Redis) - sliding window over a sorted set

pub mod rate_limiter_redis;
pub mod session_file;

pub use rate_limiter_redis::RedisRateLimiter;
pub use session_file::FileSessionStorage;
