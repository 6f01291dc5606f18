//! Route table and layer stack.
//!
//! ```text
//! TraceLayer            request spans
//!   protect             security headers + rate limit
//!     CatchPanicLayer   panics -> 500 with the boundary's fallback message
//!       handlers
//! ```

use crate::error::AppError;
use crate::handlers::{auth, health_check, todos};
use crate::middleware::{RateLimitState, protect};
use crate::state::AppState;
use axum::{
    Router,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::any::Any;
use todolist_auth::{AuthProvider, RateLimiter};
use todolist_core::TableBackend;
use todolist_runtime::boundary::CaughtError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Full application router.
pub fn router<B, A, L>(state: AppState<B, A, L>) -> Router
where
    B: TableBackend + 'static,
    A: AuthProvider + 'static,
    L: RateLimiter + 'static,
{
    let limits = RateLimitState::new(state.limiter.clone())
        .trusting_proxy_headers(state.trust_proxy_headers);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/todos",
            post(todos::create_todo::<B, A, L>).get(todos::list_todos::<B, A, L>),
        )
        .route(
            "/api/todos/with-owners",
            get(todos::list_todos_with_owners::<B, A, L>),
        )
        .route(
            "/api/todos/:id",
            get(todos::get_todo::<B, A, L>)
                .patch(todos::update_todo::<B, A, L>)
                .delete(todos::delete_todo::<B, A, L>),
        )
        .route("/api/auth/sign-in", post(auth::sign_in::<B, A, L>))
        .route("/api/auth/sign-up", post(auth::sign_up::<B, A, L>))
        .route("/api/auth/sign-out", post(auth::sign_out::<B, A, L>))
        .route("/api/auth/session", get(auth::session::<B, A, L>))
        .route("/api/auth/user", get(auth::user::<B, A, L>))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(limits, protect::<L>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = CaughtError::from_panic(payload).fallback_message();
    tracing::error!(error = %message, "Handler panicked");
    AppError::internal(&message).into_response()
}
