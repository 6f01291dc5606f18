//! Mock provider implementations for testing.
//!
//! In-memory implementations of every provider trait for unit and
//! integration tests.

pub mod auth;
pub mod rate_limiter;
pub mod session_storage;

pub use auth::MockAuthProvider;
pub use rate_limiter::MockRateLimiter;
pub use session_storage::InMemorySessionStorage;
