//! # Todolist web
//!
//! Axum HTTP surface over the todo service and the auth provider.
//!
//! # Request Flow
//!
//! 1. **Trace** the request (`tower-http`)
//! 2. **Protect**: attach security headers, count against the rate limiter
//! 3. **Extract** path, query and JSON body; malformed input is `BAD_REQUEST`
//! 4. **Call** [`TodoService`](todolist_core::TodoService) or the
//!    [`AuthProvider`](todolist_auth::AuthProvider)
//! 5. **Map** the result, or the [`DomainError`](todolist_core::DomainError)
//!    through [`AppError`], to a response
//!
//! # Example
//!
//! ```ignore
//! use todolist_web::{AppState, router};
//!
//! let state = AppState::new(todos, GoTrueClient::new(&url, &key).without_session(), limiter)
//!     .with_trusted_proxy_headers(false);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(
//!     listener,
//!     router(state).into_make_service_with_connect_info::<SocketAddr>(),
//! )
//! .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{BearerToken, ClientIp, Nonce};
pub use middleware::{NONCE_HEADER, RateLimitState, protect, rate_limit, security_headers};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
