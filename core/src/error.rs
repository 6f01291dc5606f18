//! Error taxonomy.
//!
//! [`DomainError`] is the one error type every layer above the record store
//! speaks. It is transport agnostic: the web crate maps it onto HTTP
//! responses and the error boundary formats it for display.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Status used when a caller does not pick one.
pub const DEFAULT_STATUS: u16 = 400;

/// Machine-readable error code.
///
/// Six canonical codes are provided as constants. Any other
/// `SCREAMING_SNAKE_CASE` string can be built with [`ErrorCode::custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(Cow<'static, str>);

impl ErrorCode {
    /// Malformed input or a wrapped backend failure.
    pub const BAD_REQUEST: Self = Self(Cow::Borrowed("BAD_REQUEST"));
    /// Missing or invalid credentials.
    pub const UNAUTHORIZED: Self = Self(Cow::Borrowed("UNAUTHORIZED"));
    /// Authenticated but not allowed.
    pub const FORBIDDEN: Self = Self(Cow::Borrowed("FORBIDDEN"));
    /// Read or update target absent.
    pub const NOT_FOUND: Self = Self(Cow::Borrowed("NOT_FOUND"));
    /// Reserved for write conflicts.
    pub const CONFLICT: Self = Self(Cow::Borrowed("CONFLICT"));
    /// Invariant violated after an ostensibly successful operation.
    pub const INTERNAL_ERROR: Self = Self(Cow::Borrowed("INTERNAL_ERROR"));

    /// Build a non-canonical code such as `FETCH_ERROR`.
    #[must_use]
    pub fn custom(code: impl Into<String>) -> Self {
        Self(Cow::Owned(code.into()))
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// HTTP status fixed for a canonical code, `None` for custom codes.
    #[must_use]
    pub fn canonical_status(&self) -> Option<u16> {
        match self.as_str() {
            "BAD_REQUEST" => Some(400),
            "UNAUTHORIZED" => Some(401),
            "FORBIDDEN" => Some(403),
            "NOT_FOUND" => Some(404),
            "CONFLICT" => Some(409),
            "INTERNAL_ERROR" => Some(500),
            _ => None,
        }
    }

    /// Message used when a factory is called without one.
    ///
    /// `BAD_REQUEST` and `CONFLICT` have no default; their factories
    /// always take a message.
    #[must_use]
    pub fn default_message(&self) -> Option<&'static str> {
        match self.as_str() {
            "UNAUTHORIZED" => Some("Unauthorized"),
            "FORBIDDEN" => Some("Forbidden"),
            "NOT_FOUND" => Some("Not found"),
            "INTERNAL_ERROR" => Some("Internal server error"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain error payload.
///
/// Immutable once built: the builder methods consume `self` and are meant
/// to be chained at construction time.
///
/// # Examples
///
/// ```
/// use todolist_core::{DomainError, ErrorCode};
///
/// let err = DomainError::not_found(Some("Todo not found"));
/// assert_eq!(err.code(), &ErrorCode::NOT_FOUND);
/// assert_eq!(err.status(), 404);
///
/// let err = DomainError::new("Something broke", ErrorCode::custom("FETCH_ERROR"));
/// assert_eq!(err.status(), 400);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    message: String,
    code: ErrorCode,
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Map<String, Value>>,
}

impl DomainError {
    /// Create an error with the default status of 400.
    #[must_use]
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
            status: DEFAULT_STATUS,
            details: None,
        }
    }

    /// Override the HTTP-style status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Build the canonical error for `code`, using its default message.
    ///
    /// Codes without a default message fall back to the code itself.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        let message = code.default_message().unwrap_or(code.as_str()).to_string();
        let status = code.canonical_status().unwrap_or(DEFAULT_STATUS);
        Self::new(message, code).with_status(status)
    }

    fn canonical(code: ErrorCode, message: Option<&str>) -> Self {
        let mut error = Self::from_code(code);
        if let Some(message) = message {
            error.message = message.to_string();
        }
        error
    }

    /// 400 `BAD_REQUEST`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, ErrorCode::BAD_REQUEST).with_status(400)
    }

    /// 401 `UNAUTHORIZED`, defaulting to "Unauthorized".
    #[must_use]
    pub fn unauthorized(message: Option<&str>) -> Self {
        Self::canonical(ErrorCode::UNAUTHORIZED, message)
    }

    /// 403 `FORBIDDEN`, defaulting to "Forbidden".
    #[must_use]
    pub fn forbidden(message: Option<&str>) -> Self {
        Self::canonical(ErrorCode::FORBIDDEN, message)
    }

    /// 404 `NOT_FOUND`, defaulting to "Not found".
    #[must_use]
    pub fn not_found(message: Option<&str>) -> Self {
        Self::canonical(ErrorCode::NOT_FOUND, message)
    }

    /// 409 `CONFLICT`.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(message, ErrorCode::CONFLICT).with_status(409)
    }

    /// 500 `INTERNAL_ERROR`, defaulting to "Internal server error".
    #[must_use]
    pub fn internal(message: Option<&str>) -> Self {
        Self::canonical(ErrorCode::INTERNAL_ERROR, message)
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// HTTP-style status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Structured details, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn factories_fix_code_and_status() {
        let cases = [
            (DomainError::bad_request("bad"), ErrorCode::BAD_REQUEST, 400),
            (DomainError::unauthorized(None), ErrorCode::UNAUTHORIZED, 401),
            (DomainError::forbidden(None), ErrorCode::FORBIDDEN, 403),
            (DomainError::not_found(None), ErrorCode::NOT_FOUND, 404),
            (DomainError::conflict("taken"), ErrorCode::CONFLICT, 409),
            (DomainError::internal(None), ErrorCode::INTERNAL_ERROR, 500),
        ];

        for (error, code, status) in cases {
            assert_eq!(error.code(), &code);
            assert_eq!(error.status(), status);
            assert_eq!(code.canonical_status(), Some(status));
        }
    }

    #[test]
    fn omitted_messages_use_defaults() {
        assert_eq!(DomainError::unauthorized(None).message(), "Unauthorized");
        assert_eq!(DomainError::forbidden(None).message(), "Forbidden");
        assert_eq!(DomainError::not_found(None).message(), "Not found");
        assert_eq!(
            DomainError::internal(None).message(),
            "Internal server error"
        );
    }

    #[test]
    fn explicit_message_wins_over_default() {
        let err = DomainError::not_found(Some("Todo not found"));
        assert_eq!(err.message(), "Todo not found");
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn new_defaults_to_400_and_accepts_custom_codes() {
        let err = DomainError::new("Test error", ErrorCode::custom("TEST_ERROR"));
        assert_eq!(err.status(), 400);
        assert_eq!(err.code().as_str(), "TEST_ERROR");
        assert_eq!(err.code().canonical_status(), None);
        assert!(err.details().is_none());
    }

    #[test]
    fn details_and_status_are_attached_at_construction() {
        let details = json!({ "field": "title" });
        let err = DomainError::new("Invalid", ErrorCode::BAD_REQUEST)
            .with_status(422)
            .with_details(details.as_object().unwrap().clone());

        assert_eq!(err.status(), 422);
        assert_eq!(err.details().unwrap()["field"], "title");
    }

    #[test]
    fn display_is_the_message() {
        let err = DomainError::conflict("Already exists");
        assert_eq!(err.to_string(), "Already exists");
    }

    #[test]
    fn serializes_code_as_plain_string() {
        let err = DomainError::not_found(None);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({ "message": "Not found", "code": "NOT_FOUND", "status": 404 })
        );

        let back: DomainError = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }
}
