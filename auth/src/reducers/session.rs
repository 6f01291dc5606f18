//! Session reducer.
//!
//! Applies [`SessionAction`]s to [`SessionState`] and persists the result.
//!
//! # Flow
//!
//! ```text
//! SetUser / SetAuthenticated / Logout
//!   → state updated in place
//!   → Effect: save { state, version } under the environment's name
//! ```
//!
//! Saves run as effects, one at a time and in reduce order; a save
//! overtaken by a newer one is skipped. A failed save is logged and the
//! in-memory state stays as reduced.

use crate::actions::SessionAction;
use crate::environment::SessionEnvironment;
use crate::providers::SessionStorage;
use crate::state::{PersistedSession, SessionState};
use std::marker::PhantomData;
use todolist_core::effect::Effect;
use todolist_core::reducer::Reducer;
use todolist_core::{SmallVec, smallvec};

/// Session reducer.
///
/// # Type Parameters
///
/// - `S`: Session storage
pub struct SessionReducer<S> {
    _storage: PhantomData<S>,
}

impl<S> SessionReducer<S> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _storage: PhantomData,
        }
    }
}

impl<S> Default for SessionReducer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for SessionReducer<S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for SessionReducer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionReducer")
    }
}

impl<S> SessionReducer<S>
where
    S: SessionStorage + Clone + 'static,
{
    fn persist(state: &SessionState, env: &SessionEnvironment<S>) -> Effect<SessionAction> {
        let storage = env.storage.clone();
        let name = env.name.clone();
        let saves = env.saves.clone();
        let ticket = saves.ticket();
        let document = PersistedSession::current(state.clone());

        Effect::fire_and_forget(async move {
            let mut written = saves.writer().await;
            if *written > ticket {
                tracing::debug!(name = %name, ticket, "Skipping superseded session save");
                return;
            }
            *written = ticket;

            match storage.save(&name, &document).await {
                Ok(()) => tracing::debug!(
                    name = %name,
                    is_authenticated = document.state.is_authenticated,
                    "Session persisted"
                ),
                Err(error) => tracing::warn!(
                    name = %name,
                    error = %error,
                    "Failed to persist session"
                ),
            }
        })
    }
}

impl<S> Reducer for SessionReducer<S>
where
    S: SessionStorage + Clone + 'static,
{
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment<S>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::SetUser { user } => state.user = user,
            SessionAction::SetAuthenticated { status } => state.is_authenticated = status,
            SessionAction::Logout => *state = SessionState::default(),
        }

        smallvec![Self::persist(state, env)]
    }
}
