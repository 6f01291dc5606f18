//! Error boundary.
//!
//! A two-state machine, `Healthy` and `Failed`, run by the [`Store`]. While
//! failed, the boundary renders a fallback instead of its view until the
//! user asks to try again.

use crate::store::Store;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use todolist_core::effect::Effect;
use todolist_core::reducer::Reducer;
use todolist_core::{DomainError, SmallVec, smallvec};

/// Message shown when the caught error carries none.
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred";

/// An error caught by the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CaughtError {
    /// A taxonomy error; shown with its code.
    Domain(DomainError),
    /// Anything else; shown by message.
    Other(String),
}

impl CaughtError {
    /// Convert a panic payload. `DomainError` payloads keep their code.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<DomainError>() {
            Ok(error) => return Self::Domain(*error),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<String>() {
            Ok(message) => return Self::Other(*message),
            Err(payload) => payload,
        };
        match payload.downcast::<&'static str>() {
            Ok(message) => Self::Other((*message).to_string()),
            Err(_) => Self::Other(String::new()),
        }
    }

    /// Text for the fallback panel.
    #[must_use]
    pub fn fallback_message(&self) -> String {
        match self {
            Self::Domain(error) => format!("{} ({})", error.message(), error.code()),
            Self::Other(message) if message.is_empty() => GENERIC_MESSAGE.to_string(),
            Self::Other(message) => message.clone(),
        }
    }
}

impl From<DomainError> for CaughtError {
    fn from(error: DomainError) -> Self {
        Self::Domain(error)
    }
}

impl From<String> for CaughtError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl From<&str> for CaughtError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}

/// Boundary state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BoundaryState {
    /// Rendering the view.
    #[default]
    Healthy,
    /// Rendering the fallback for `error`.
    Failed {
        /// The error that tripped the boundary.
        error: CaughtError,
    },
}

impl BoundaryState {
    /// Whether the fallback is showing.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Boundary actions.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryAction {
    /// Rendering failed with `error`.
    Caught {
        /// What went wrong.
        error: CaughtError,
    },
    /// The user asked to render again.
    TryAgain,
}

/// Names the boundary in logs.
#[derive(Debug, Clone)]
pub struct BoundaryEnvironment {
    /// Component the boundary wraps.
    pub component: &'static str,
}

impl Default for BoundaryEnvironment {
    fn default() -> Self {
        Self { component: "app" }
    }
}

/// Healthy/Failed transitions. Logs once per trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryReducer;

impl Reducer for BoundaryReducer {
    type State = BoundaryState;
    type Action = BoundaryAction;
    type Environment = BoundaryEnvironment;

    fn reduce(
        &self,
        state: &mut BoundaryState,
        action: BoundaryAction,
        env: &BoundaryEnvironment,
    ) -> SmallVec<[Effect<BoundaryAction>; 4]> {
        match action {
            BoundaryAction::Caught { error } if !state.is_failed() => {
                let component = env.component;
                let logged = error.clone();
                *state = BoundaryState::Failed { error };

                smallvec![Effect::fire_and_forget(async move {
                    tracing::error!(component, error = ?logged, "Uncaught error");
                })]
            },
            BoundaryAction::TryAgain if state.is_failed() => {
                *state = BoundaryState::Healthy;
                smallvec![Effect::None]
            },
            _ => smallvec![Effect::None],
        }
    }
}

/// Default fallback: a title, the error text and a retry action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackPanel {
    /// Heading.
    pub title: String,
    /// Formatted error.
    pub message: String,
    /// Retry button label.
    pub action: String,
}

impl FallbackPanel {
    /// Panel for `error`.
    #[must_use]
    pub fn for_error(error: &CaughtError) -> Self {
        Self {
            title: "Oops!".to_string(),
            message: error.fallback_message(),
            action: "Try again".to_string(),
        }
    }
}

/// What a render produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<V> {
    /// The wrapped view.
    View(V),
    /// The caller-supplied fallback.
    Custom(V),
    /// The default panel.
    Panel(FallbackPanel),
}

type BoundaryStore = Store<BoundaryState, BoundaryAction, BoundaryEnvironment, BoundaryReducer>;

/// Wraps rendering so failures show a fallback instead of propagating.
///
/// # Example
///
/// ```ignore
/// let boundary = ErrorBoundary::new();
///
/// match boundary.render(|| render_todo_list(&todos)).await {
///     Rendered::View(html) => html,
///     Rendered::Custom(html) => html,
///     Rendered::Panel(panel) => render_panel(&panel),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBoundary<V> {
    store: BoundaryStore,
    fallback: Option<V>,
}

impl<V: Clone> Default for ErrorBoundary<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ErrorBoundary<V> {
    /// Boundary with the default panel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_environment(BoundaryEnvironment::default())
    }

    /// Boundary logging under `environment.component`.
    #[must_use]
    pub fn with_environment(environment: BoundaryEnvironment) -> Self {
        Self {
            store: Store::new(BoundaryState::Healthy, BoundaryReducer, environment),
            fallback: None,
        }
    }

    /// Show `fallback` instead of the default panel.
    #[must_use]
    pub fn with_fallback(mut self, fallback: V) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Current state.
    pub async fn state(&self) -> BoundaryState {
        self.store.state(BoundaryState::clone).await
    }

    /// Render `view`, catching panics.
    ///
    /// While failed, `view` is not called.
    pub async fn render<F>(&self, view: F) -> Rendered<V>
    where
        F: FnOnce() -> V,
    {
        self.render_result(|| {
            panic::catch_unwind(AssertUnwindSafe(view)).map_err(CaughtError::from_panic)
        })
        .await
    }

    /// Render a fallible `view`; an `Err` trips the boundary like a panic.
    pub async fn render_result<F, E>(&self, view: F) -> Rendered<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<CaughtError>,
    {
        if let Some(error) = self.failure().await {
            return self.fallback_for(&error);
        }

        match view() {
            Ok(rendered) => Rendered::View(rendered),
            Err(error) => {
                let error = error.into();
                self.catch(error.clone()).await;
                self.fallback_for(&error)
            },
        }
    }

    /// Trip the boundary with `error`.
    pub async fn catch(&self, error: CaughtError) {
        if let Ok(mut handle) = self.store.send(BoundaryAction::Caught { error }).await {
            handle.wait().await;
        }
    }

    /// Return to `Healthy` without re-running anything.
    pub async fn try_again(&self) {
        let _ = self.store.send(BoundaryAction::TryAgain).await;
    }

    async fn failure(&self) -> Option<CaughtError> {
        self.store
            .state(|state| match state {
                BoundaryState::Failed { error } => Some(error.clone()),
                BoundaryState::Healthy => None,
            })
            .await
    }

    fn fallback_for(&self, error: &CaughtError) -> Rendered<V> {
        self.fallback.clone().map_or_else(
            || Rendered::Panel(FallbackPanel::for_error(error)),
            Rendered::Custom,
        )
    }
}
