//! Provider traits for auth, session persistence and rate limiting.
//!
//! Each trait has a production implementation (HTTP client in this module,
//! storage-backed ones in [`crate::stores`]) and an in-memory one in
//! `mocks`.

pub mod auth;
pub mod gotrue;
pub mod rate_limiter;
pub mod session_storage;

pub use auth::AuthProvider;
pub use gotrue::GoTrueClient;
pub use rate_limiter::{RateLimitDecision, RateLimiter};
pub use session_storage::SessionStorage;
