//! GoTrue HTTP client.
//!
//! Talks to the hosted auth API under `<base>/auth/v1`. Every request carries
//! the anon key as `apikey`; authenticated calls use the session's access
//! token as bearer.

use crate::error::{AuthError, Result};
use crate::providers::AuthProvider;
use crate::state::{AuthResponse, AuthSession, Credentials, User};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Auth provider backed by a GoTrue server.
///
/// Clones share the current session. A client built with
/// [`GoTrueClient::without_session`] keeps none, for servers that act on
/// each caller's own token.
///
/// # Example
///
/// ```no_run
/// use todolist_auth::providers::{AuthProvider, GoTrueClient};
/// use todolist_auth::Credentials;
///
/// # async fn example() -> todolist_auth::Result<()> {
/// let auth = GoTrueClient::new("https://project.supabase.co", "anon-key");
/// auth.sign_in_with_password(&Credentials::new("ada@example.com", "secret")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GoTrueClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    persist_session: bool,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl std::fmt::Debug for GoTrueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueClient")
            .field("base_url", &self.base_url)
            .field("persist_session", &self.persist_session)
            .finish_non_exhaustive()
    }
}

/// Error body variants GoTrue has used across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
    }
}

impl GoTrueClient {
    /// Client for the project at `base_url` using `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    /// Client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(
        http_client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            persist_session: true,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Stop remembering sessions: sign-in and sign-up only return them.
    #[must_use]
    pub fn without_session(mut self) -> Self {
        self.persist_session = false;
        self
    }

    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/auth/v1/{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn current_session(&self) -> Result<Option<AuthSession>> {
        self.session
            .read()
            .map(|session| session.clone())
            .map_err(|_| AuthError::InternalError("Session lock poisoned".into()))
    }

    fn store_session(&self, session: Option<AuthSession>) -> Result<()> {
        if !self.persist_session {
            return Ok(());
        }
        let mut guard = self
            .session
            .write()
            .map_err(|_| AuthError::InternalError("Session lock poisoned".into()))?;
        *guard = session;
        Ok(())
    }

    async fn provider_error(response: Response) -> AuthError {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Auth request failed")
                    .to_string()
            });

        tracing::debug!(status = status.as_u16(), %message, "Auth provider rejected request");
        AuthError::provider(status.as_u16(), message)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Option<User>> {
        let response = self
            .request(Method::GET, "user", access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            tracing::debug!(status = response.status().as_u16(), "Access token not accepted");
            return Ok(None);
        }
        decode(Self::json_or_error(response).await?).map(Some)
    }

    async fn revoke(&self, access_token: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "logout", access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // The token is already gone on the server side.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::provider_error(response).await),
        }
    }

    async fn json_or_error(response: Response) -> Result<Value> {
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        Ok(response.json().await?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

impl AuthProvider for GoTrueClient {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "token?grant_type=password", &self.api_key)
            .json(credentials)
            .send()
            .await?;

        let session: AuthSession = decode(Self::json_or_error(response).await?)?;
        tracing::info!(user_id = %session.user.id, "Signed in");

        self.store_session(Some(session.clone()))?;
        Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self
            .request(Method::POST, "signup", &self.api_key)
            .json(credentials)
            .send()
            .await?;

        let body = Self::json_or_error(response).await?;

        // Auto-confirmed projects answer with a session, others with the bare user.
        if body.get("access_token").is_some() {
            let session: AuthSession = decode(body)?;
            tracing::info!(user_id = %session.user.id, "Signed up with session");
            self.store_session(Some(session.clone()))?;
            return Ok(AuthResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }

        let user: User = decode(body)?;
        tracing::info!(user_id = %user.id, "Signed up, confirmation pending");
        Ok(AuthResponse {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.current_session()? else {
            return Ok(());
        };
        self.store_session(None)?;
        self.revoke(&session.access_token).await?;

        tracing::info!(user_id = %session.user.id, "Signed out");
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<AuthSession>> {
        self.current_session()
    }

    async fn get_user(&self) -> Result<Option<User>> {
        let Some(session) = self.current_session()? else {
            return Ok(None);
        };

        self.fetch_user(&session.access_token).await
    }

    async fn get_user_with_token(&self, access_token: &str) -> Result<Option<User>> {
        self.fetch_user(access_token).await
    }

    async fn sign_out_with_token(&self, access_token: &str) -> Result<()> {
        self.revoke(access_token).await
    }
}
