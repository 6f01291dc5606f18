//! Request middleware: security headers and rate limiting.
//!
//! [`protect`] runs both for every request:
//!
//! 1. **Generate** a fresh nonce and the security header set around it
//! 2. **Count** the request against the limiter under the client key
//! 3. **Reject** with 429 and the rate-limit headers when over the limit;
//!    security headers are not attached to the rejection
//! 4. **Forward** the request with the security headers injected, and copy
//!    them plus the rate-limit headers onto the response
//!
//! When the limiter itself fails the request passes without rate-limit
//! headers.
//!
//! Requests are counted under the connection address unless
//! [`RateLimitState::trusting_proxy_headers`] is set, in which case a
//! forwarding proxy's `X-Forwarded-For`/`X-Real-IP` is honored.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state};
//! use todolist_web::middleware::protect;
//!
//! let app = Router::new()
//!     .route("/api/todos", get(list_todos))
//!     .layer(from_fn_with_state(
//!         RateLimitState::new(Arc::new(limiter)),
//!         protect::<RedisRateLimiter>,
//!     ));
//! ```

use crate::extractors::{ClientIp, client_key};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::net::SocketAddr;
use std::sync::Arc;
use todolist_auth::{RateLimitDecision, RateLimiter};
use uuid::Uuid;

/// Header carrying the request nonce to handlers.
pub const NONCE_HEADER: &str = "x-nonce";

/// Requests allowed per window.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "X-RateLimit-Limit";

/// Requests left in the window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// When the window frees a slot.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Body of the rejection response.
pub const TOO_MANY_REQUESTS_BODY: &str = "Too Many Requests";

const CSP_TEMPLATE: &str = "
    default-src 'self';
    script-src 'self' 'nonce-{nonce}' 'strict-dynamic';
    style-src 'self' 'nonce-{nonce}';
    img-src 'self' blob: data:;
    font-src 'self';
    object-src 'none';
    base-uri 'self';
    form-action 'self';
    frame-ancestors 'none';
    block-all-mixed-content;
    upgrade-insecure-requests;
";

/// Base64 of a fresh UUID v4 string.
#[must_use]
pub fn generate_nonce() -> String {
    STANDARD.encode(Uuid::new_v4().to_string())
}

/// Content security policy allowing scripts and styles tagged with `nonce`.
#[must_use]
pub fn content_security_policy(nonce: &str) -> String {
    CSP_TEMPLATE
        .replace("{nonce}", nonce)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Security header set for a request with `nonce`.
#[must_use]
pub fn security_headers(nonce: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(nonce) {
        headers.insert(HeaderName::from_static(NONCE_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(&content_security_policy(nonce)) {
        headers.insert(header::CONTENT_SECURITY_POLICY, value);
    }
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );

    headers
}

/// `X-RateLimit-*` headers for `decision`.
#[must_use]
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(decision.reset),
    );
    headers
}

/// State of the rate-limiting middleware.
pub struct RateLimitState<L> {
    limiter: Arc<L>,
    trust_proxy_headers: bool,
}

impl<L> RateLimitState<L> {
    /// Count requests with `limiter`, keyed by connection address.
    #[must_use]
    pub const fn new(limiter: Arc<L>) -> Self {
        Self {
            limiter,
            trust_proxy_headers: false,
        }
    }

    /// Key requests by forwarding headers. Only for deployments behind a
    /// proxy that overwrites them.
    #[must_use]
    pub const fn trusting_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    fn key(&self, req: &Request) -> String {
        client_key(
            req.headers(),
            req.extensions().get::<ConnectInfo<SocketAddr>>(),
            self.trust_proxy_headers,
        )
    }
}

// Manual impl so `L` need not be `Clone`.
impl<L> Clone for RateLimitState<L> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}

impl<L> std::fmt::Debug for RateLimitState<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitState")
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}

/// Outcome of counting a request.
enum Admission {
    /// Allowed; attach these headers to the response.
    Allowed(HeaderMap),
    /// The limiter failed; let the request through untouched.
    Unchecked,
    /// Over the limit.
    Rejected(Response),
}

async fn admit<L: RateLimiter>(limiter: &L, key: String) -> Admission {
    match limiter.limit(&key).await {
        Ok(decision) if decision.success => Admission::Allowed(rate_limit_headers(&decision)),
        Ok(decision) => {
            metrics::counter!("http.rate_limited.total").increment(1);
            tracing::warn!(
                key = %key,
                limit = decision.limit,
                reset = decision.reset,
                "Request rejected by rate limiter"
            );
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                rate_limit_headers(&decision),
                TOO_MANY_REQUESTS_BODY,
            )
                .into_response();
            Admission::Rejected(response)
        },
        Err(error) => {
            tracing::error!(key = %key, error = %error, "Rate limiter failed, letting request through");
            Admission::Unchecked
        },
    }
}

/// Rate limiting alone: 429 over the limit, otherwise the handler's
/// response with the rate-limit headers attached.
pub async fn rate_limit<L>(
    State(state): State<RateLimitState<L>>,
    mut req: Request,
    next: Next,
) -> Response
where
    L: RateLimiter + 'static,
{
    let key = state.key(&req);
    req.extensions_mut().insert(ClientIp(key.clone()));
    match admit(state.limiter.as_ref(), key).await {
        Admission::Rejected(response) => response,
        Admission::Unchecked => next.run(req).await,
        Admission::Allowed(headers) => {
            let mut response = next.run(req).await;
            response.headers_mut().extend(headers);
            response
        },
    }
}

/// Security headers plus rate limiting.
pub async fn protect<L>(
    State(state): State<RateLimitState<L>>,
    mut req: Request,
    next: Next,
) -> Response
where
    L: RateLimiter + 'static,
{
    let security = security_headers(&generate_nonce());

    let key = state.key(&req);
    req.extensions_mut().insert(ClientIp(key.clone()));
    let limits = match admit(state.limiter.as_ref(), key).await {
        Admission::Rejected(response) => return response,
        Admission::Unchecked => None,
        Admission::Allowed(headers) => Some(headers),
    };

    req.headers_mut().extend(security.clone());
    let mut response = next.run(req).await;

    response.headers_mut().extend(security);
    if let Some(limits) = limits {
        response.headers_mut().extend(limits);
    }
    response
}
