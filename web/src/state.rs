//! Application state shared across handlers.

use std::sync::Arc;
use todolist_core::TodoService;

/// Collaborators every handler can reach.
///
/// Generic over the backend `B`, the auth provider `A` and the rate limiter
/// `L` so tests can swap in the in-memory implementations.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(
///     TodoService::new(RecordStore::new(PostgrestBackend::new(&url, &key))),
///     GoTrueClient::new(&url, &key).without_session(),
///     RedisRateLimiter::new(&redis_url, Some(&token), 10, Duration::from_secs(10)).await?,
/// )
/// .with_trusted_proxy_headers(config.trust_proxy_headers);
/// let app = router(state);
/// ```
pub struct AppState<B, A, L> {
    /// Todo operations.
    pub todos: TodoService<B>,
    /// Sign-in and session provider.
    pub auth: Arc<A>,
    /// Per-client request limiter.
    pub limiter: Arc<L>,
    /// Key the limiter by `X-Forwarded-For`/`X-Real-IP` instead of the
    /// connection address.
    pub trust_proxy_headers: bool,
}

impl<B, A, L> AppState<B, A, L> {
    /// Bundle the collaborators.
    #[must_use]
    pub fn new(todos: TodoService<B>, auth: A, limiter: L) -> Self {
        Self {
            todos,
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
            trust_proxy_headers: false,
        }
    }

    /// Honor forwarding headers for the rate-limit key. Only for deployments
    /// behind a proxy that overwrites them.
    #[must_use]
    pub const fn with_trusted_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

// Manual impl so `B`, `A` and `L` need not be `Clone`.
impl<B, A, L> Clone for AppState<B, A, L> {
    fn clone(&self) -> Self {
        Self {
            todos: self.todos.clone(),
            auth: Arc::clone(&self.auth),
            limiter: Arc::clone(&self.limiter),
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}

impl<B, A, L> std::fmt::Debug for AppState<B, A, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}
