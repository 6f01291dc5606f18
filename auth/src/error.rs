//! Error types for authentication, session persistence and rate limiting.

use thiserror::Error;

/// Result type alias for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures of the auth boundary and its adapters.
///
/// Provider failures are passed through as reported; mapping them onto the
/// domain error taxonomy is left to the HTTP layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Provider Errors
    // ═══════════════════════════════════════════════════════════

    /// The auth provider rejected the request.
    #[error("{message}")]
    Provider {
        /// HTTP status reported by the provider
        status: u16,
        /// Provider message
        message: String,
    },

    /// The provider could not be reached.
    #[error("Auth transport error: {0}")]
    Transport(String),

    /// The provider answered with a body we could not decode.
    #[error("Invalid auth response: {0}")]
    InvalidResponse(String),

    // ═══════════════════════════════════════════════════════════
    // Infrastructure Errors
    // ═══════════════════════════════════════════════════════════

    /// Session storage failed to read or write.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// The rate limiter backend failed.
    #[error("Rate limiter error: {0}")]
    RateLimiter(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Provider rejection with `status` and `message`.
    #[must_use]
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Whether the provider refused the caller's credentials or input.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Provider { status: 400 | 401 | 403 | 422, .. })
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(error: redis::RedisError) -> Self {
        Self::RateLimiter(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_display_the_provider_message() {
        let error = AuthError::provider(400, "Invalid login credentials");
        assert_eq!(error.to_string(), "Invalid login credentials");
    }

    #[test]
    fn only_client_side_provider_statuses_are_rejections() {
        for status in [400, 401, 403, 422] {
            assert!(AuthError::provider(status, "nope").is_rejection());
        }
        assert!(!AuthError::provider(500, "down").is_rejection());
        assert!(!AuthError::Transport("refused".into()).is_rejection());
    }
}
