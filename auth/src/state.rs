//! Auth and session state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name under which the session document is persisted.
pub const SESSION_STORAGE_NAME: &str = "app-storage";

/// Version written with every persisted session document.
pub const SESSION_STORAGE_VERSION: u32 = 0;

/// An authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider user id.
    pub id: String,
    /// Primary email, if the account has one.
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form profile data (`full_name`, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_metadata: Map<String, Value>,
    /// Account creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// User with only an id and email.
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: Map::new(),
            created_at: None,
        }
    }

    /// `full_name` from the profile metadata.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(Value::as_str)
    }
}

/// Client-side session state.
///
/// `is_authenticated` and `user` are set independently; nothing forces
/// them to agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether the client considers itself signed in.
    pub is_authenticated: bool,
    /// The signed-in user, if known.
    pub user: Option<User>,
}

/// Session state as written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Persisted state.
    pub state: SessionState,
    /// Document version.
    pub version: u32,
}

impl PersistedSession {
    /// Wrap `state` with the current version.
    #[must_use]
    pub const fn current(state: SessionState) -> Self {
        Self {
            state,
            version: SESSION_STORAGE_VERSION,
        }
    }
}

/// Tokens and user of a provider session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for data requests.
    pub access_token: String,
    /// Token used to renew the session.
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Unix seconds at which the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Token type, normally `bearer`.
    pub token_type: String,
    /// Session owner.
    pub user: User,
}

// Tokens stay out of logs.
impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of sign-in and sign-up.
///
/// Sign-up without auto-confirm yields a user but no session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The account.
    pub user: Option<User>,
    /// The new session, when one was issued.
    pub session: Option<AuthSession>,
}

/// Email and password pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Pair `email` with `password`.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
