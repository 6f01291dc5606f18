//! Persisted client session store.
//!
//! The session lives in a runtime [`Store`] driven by [`SessionReducer`].
//! [`open_session_store`] rehydrates it from storage first, and
//! [`SessionTrackingProvider`] keeps it in step with an [`AuthProvider`].

use crate::actions::SessionAction;
use crate::environment::SessionEnvironment;
use crate::error::Result;
use crate::providers::{AuthProvider, SessionStorage};
use crate::reducers::SessionReducer;
use crate::state::{
    AuthResponse, AuthSession, Credentials, SESSION_STORAGE_VERSION, SessionState, User,
};
use std::sync::Arc;
use todolist_runtime::Store;

/// Store holding the client session.
pub type SessionStore<S> =
    Store<SessionState, SessionAction, SessionEnvironment<S>, SessionReducer<S>>;

/// Open the session store, starting from whatever `environment.storage`
/// holds under `environment.name`.
///
/// A missing, unreadable or differently versioned document starts the store
/// from the default state.
///
/// # Example
///
/// ```ignore
/// let session = open_session_store(SessionEnvironment::new(FileSessionStorage::new(".session"))).await;
/// session.send(SessionAction::SetAuthenticated { status: true }).await?;
/// ```
pub async fn open_session_store<S>(environment: SessionEnvironment<S>) -> SessionStore<S>
where
    S: SessionStorage + Clone + 'static,
{
    let state = rehydrate(&environment).await;
    Store::new(state, SessionReducer::new(), environment)
}

async fn rehydrate<S>(environment: &SessionEnvironment<S>) -> SessionState
where
    S: SessionStorage + Clone,
{
    let name = environment.name.as_str();
    match environment.storage.load(name).await {
        Ok(Some(document)) if document.version == SESSION_STORAGE_VERSION => {
            tracing::debug!(
                name = %name,
                is_authenticated = document.state.is_authenticated,
                "Session rehydrated"
            );
            document.state
        },
        Ok(Some(document)) => {
            tracing::warn!(
                name = %name,
                version = document.version,
                "Discarding persisted session with unknown version"
            );
            SessionState::default()
        },
        Ok(None) => {
            tracing::debug!(name = %name, "No persisted session");
            SessionState::default()
        },
        Err(error) => {
            tracing::warn!(name = %name, error = %error, "Failed to load persisted session");
            SessionState::default()
        },
    }
}

/// [`AuthProvider`] that mirrors successful sign-in, sign-up and sign-out
/// into a [`SessionStore`].
///
/// Session updates are applied after the provider call succeeds and their
/// persistence is awaited. A store that no longer accepts actions is logged
/// and does not fail the auth call.
pub struct SessionTrackingProvider<A, S>
where
    S: SessionStorage + Clone + 'static,
{
    inner: A,
    session: Arc<SessionStore<S>>,
}

impl<A, S> SessionTrackingProvider<A, S>
where
    S: SessionStorage + Clone + 'static,
{
    /// Wrap `inner`, recording into `session`.
    #[must_use]
    pub const fn new(inner: A, session: Arc<SessionStore<S>>) -> Self {
        Self { inner, session }
    }

    /// The tracked session store.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionStore<S>> {
        &self.session
    }

    async fn apply(&self, action: SessionAction) {
        match self.session.send(action).await {
            Ok(mut handle) => handle.wait().await,
            Err(error) => {
                tracing::warn!(error = %error, "Session store rejected update");
            },
        }
    }

    async fn record(&self, response: &AuthResponse) {
        self.apply(SessionAction::SetUser {
            user: response.user.clone(),
        })
        .await;
        self.apply(SessionAction::SetAuthenticated {
            status: response.session.is_some(),
        })
        .await;
    }
}

impl<A, S> std::fmt::Debug for SessionTrackingProvider<A, S>
where
    A: std::fmt::Debug,
    S: SessionStorage + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTrackingProvider")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<A, S> AuthProvider for SessionTrackingProvider<A, S>
where
    A: AuthProvider,
    S: SessionStorage + Clone + Send + Sync + 'static,
{
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self.inner.sign_in_with_password(credentials).await?;
        self.record(&response).await;
        Ok(response)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let response = self.inner.sign_up(credentials).await?;
        self.record(&response).await;
        Ok(response)
    }

    async fn sign_out(&self) -> Result<()> {
        self.inner.sign_out().await?;
        self.apply(SessionAction::Logout).await;
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<AuthSession>> {
        self.inner.get_session().await
    }

    async fn get_user(&self) -> Result<Option<User>> {
        self.inner.get_user().await
    }

    async fn get_user_with_token(&self, access_token: &str) -> Result<Option<User>> {
        self.inner.get_user_with_token(access_token).await
    }

    async fn sign_out_with_token(&self, access_token: &str) -> Result<()> {
        self.inner.sign_out_with_token(access_token).await
    }
}
