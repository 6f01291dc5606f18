//! # Todolist Authentication
//!
//! Auth boundary, persisted client session and request rate limiting.
//!
//! ## Components
//!
//! - **Auth provider**: [`AuthProvider`] with a GoTrue HTTP client
//!   ([`providers::GoTrueClient`]) for password sign-in, sign-up, sign-out
//!   and session/user lookup.
//! - **Session store**: a runtime store driven by [`SessionReducer`] that
//!   persists `{ state, version }` under `app-storage` after every action.
//! - **Rate limiter**: [`RateLimiter`] with a Redis sliding window
//!   ([`stores::RedisRateLimiter`]).
//!
//! ## Architecture
//!
//! The session store follows the runtime's reducer model:
//!
//! ```text
//! SessionAction → SessionReducer → (SessionState, save effect) → SessionStorage
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use todolist_auth::*;
//!
//! let session = open_session_store(SessionEnvironment::new(storage)).await;
//!
//! let response = auth.sign_in_with_password(&Credentials::new(email, password)).await?;
//! session.send(SessionAction::SetUser { user: response.user }).await?;
//! session.send(SessionAction::SetAuthenticated { status: true }).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod environment;
pub mod error;
pub mod providers;
pub mod reducers;
pub mod session;
pub mod state;
pub mod stores;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::SessionAction;
pub use environment::{SaveOrder, SessionEnvironment};
pub use error::{AuthError, Result};
pub use providers::{AuthProvider, RateLimitDecision, RateLimiter, SessionStorage};
pub use reducers::SessionReducer;
pub use session::{SessionStore, SessionTrackingProvider, open_session_store};
pub use state::{
    AuthResponse, AuthSession, Credentials, PersistedSession, SESSION_STORAGE_NAME,
    SESSION_STORAGE_VERSION, SessionState, User,
};
