//! Error types for web handlers.
//!
//! [`AppError`] carries a [`DomainError`] to the client as
//! `{ "code", "message", "details"? }` with the error's status.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use todolist_auth::AuthError;
use todolist_core::{DomainError, ErrorCode};

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<B, A, L>>) -> Result<Json<Todo>, AppError> {
///     let todo = state.todos.find_by_id(&id).await?;
///     Ok(Json(todo))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// Error shown to the client
    error: DomainError,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Wrap a domain error.
    #[must_use]
    pub const fn new(error: DomainError) -> Self {
        Self {
            error,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(DomainError::bad_request(message))
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::new(DomainError::unauthorized(Some(message)))
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: &str) -> Self {
        Self::new(DomainError::internal(Some(message)))
    }

    /// The wrapped domain error.
    #[must_use]
    pub const fn error(&self) -> &DomainError {
        &self.error
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error.code(), self.error.message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    /// Error code (for client error handling).
    code: &'a ErrorCode,
    /// Human-readable error message.
    message: &'a str,
    /// Structured details, when the error has any.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Map<String, Value>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log internal errors
        if status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %status,
                    code = %self.error.code(),
                    message = %self.error.message(),
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %status,
                    code = %self.error.code(),
                    message = %self.error.message(),
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.error.code(),
            message: self.error.message(),
            details: self.error.details(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        Self::new(error)
    }
}

/// Provider rejections become `UNAUTHORIZED` with the provider's message;
/// every other auth failure is internal.
impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Provider { ref message, .. } if error.is_rejection() => {
                Self::unauthorized(message)
            },
            other => {
                let message = other.to_string();
                Self::new(DomainError::internal(None)).with_source(anyhow::Error::msg(message))
            },
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(DomainError::internal(None)).with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[tokio::test]
    async fn domain_errors_render_code_message_and_status() {
        let response = AppError::from(DomainError::not_found(Some("Todo not found"))).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "code": "NOT_FOUND", "message": "Todo not found" })
        );
    }

    #[tokio::test]
    async fn details_are_included_when_present() {
        let mut details = Map::new();
        details.insert("cause".into(), json!("JWT expired"));
        let error = DomainError::bad_request("Failed to fetch todos with owners").with_details(details);

        let body = body_json(AppError::from(error).into_response()).await;

        assert_eq!(body["details"]["cause"], "JWT expired");
    }

    #[test]
    fn auth_rejections_are_unauthorized() {
        let err = AppError::from(AuthError::provider(400, "Invalid login credentials"));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error().message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn other_auth_failures_are_internal_and_hide_the_cause() {
        let err = AppError::from(AuthError::Transport("connection refused".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(err.into_response()).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn custom_codes_keep_their_status() {
        let err = AppError::from(DomainError::new("Upstream down", ErrorCode::custom("FETCH_ERROR")));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
