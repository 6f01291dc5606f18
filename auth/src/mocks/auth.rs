//! Mock auth provider for testing.

use crate::error::{AuthError, Result};
use crate::providers::AuthProvider;
use crate::state::{AuthResponse, AuthSession, Credentials, User};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: User,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, User>,
    session: Option<AuthSession>,
}

impl Inner {
    fn issue_session(&mut self, user: &User) -> AuthSession {
        let session = AuthSession {
            access_token: format!("access-{}", uuid::Uuid::new_v4()),
            refresh_token: format!("refresh-{}", uuid::Uuid::new_v4()),
            expires_in: 3600,
            expires_at: None,
            token_type: "bearer".into(),
            user: user.clone(),
        };
        self.tokens.insert(session.access_token.clone(), user.clone());
        self.session = Some(session.clone());
        session
    }
}

/// In-memory auth provider with an account table and auto-confirmed sign-up.
///
/// Rejections use the statuses and messages the hosted service reports.
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockAuthProvider {
    /// Provider without accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account for `email` with `password`.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: User::new(uuid::Uuid::new_v4().to_string(), email),
                },
            );
        }
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))
    }
}

impl AuthProvider for MockAuthProvider {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let mut inner = self.lock()?;
        let user = match inner.accounts.get(&credentials.email) {
            Some(account) if account.password == credentials.password => account.user.clone(),
            _ => return Err(AuthError::provider(400, "Invalid login credentials")),
        };

        let session = inner.issue_session(&user);
        Ok(AuthResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let mut inner = self.lock()?;
        if inner.accounts.contains_key(&credentials.email) {
            return Err(AuthError::provider(422, "User already registered"));
        }

        let user = User::new(uuid::Uuid::new_v4().to_string(), credentials.email.as_str());
        inner.accounts.insert(
            credentials.email.clone(),
            Account {
                password: credentials.password.clone(),
                user: user.clone(),
            },
        );

        let session = inner.issue_session(&user);
        Ok(AuthResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(session) = inner.session.take() {
            inner.tokens.remove(&session.access_token);
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.lock()?.session.clone())
    }

    async fn get_user(&self) -> Result<Option<User>> {
        Ok(self.lock()?.session.as_ref().map(|s| s.user.clone()))
    }

    async fn get_user_with_token(&self, access_token: &str) -> Result<Option<User>> {
        Ok(self.lock()?.tokens.get(access_token).cloned())
    }

    async fn sign_out_with_token(&self, access_token: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.tokens.remove(access_token);
        if inner
            .session
            .as_ref()
            .is_some_and(|s| s.access_token == access_token)
        {
            inner.session = None;
        }
        Ok(())
    }
}
