//! # Todolist Core
//!
//! Core types for the todolist backend.
//!
//! This crate holds everything that does not depend on a transport:
//!
//! - **Error taxonomy**: [`DomainError`] with a machine-readable [`ErrorCode`],
//!   an HTTP-style status, a message and optional structured details
//! - **Backend capability**: [`TableBackend`], the injected table client
//! - **Record store**: [`RecordStore`], a typed pass-through over a backend
//! - **Todo service**: [`TodoService`], the single error translation boundary
//! - **Reducer primitives**: `Reducer`, `Effect` and `Clock`, used by the
//!   session store and the error boundary
//!
//! ## Example
//!
//! ```ignore
//! use todolist_core::{CreateTodo, OwnerId, RecordStore, TodoService};
//!
//! let service = TodoService::new(RecordStore::new(backend));
//!
//! let todo = service
//!     .create(CreateTodo::new("Test Todo", OwnerId::new("user1")))
//!     .await?;
//! assert!(!todo.completed);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Backend capability trait and its error type
pub mod backend;

/// Error taxonomy shared by every layer
pub mod error;

/// Read query builder passed to backends
pub mod query;

/// Todo domain service
pub mod service;

/// Generic typed record store
pub mod store;

/// Todo record types
pub mod todo;

pub use backend::{BackendError, TableBackend};
pub use error::{DomainError, ErrorCode};
pub use query::{Embed, Filter, FilterOp, Order, Select};
pub use service::TodoService;
pub use store::{RecordStore, StoreError};
pub use todo::{CreateTodo, OwnerId, OwnerInfo, Todo, TodoId, TodoWithOwner, UpdateTodo};

/// Reducer module - The core trait for state machines
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They hold the session and error-boundary logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SessionReducer {
    ///     type State = SessionState;
    ///     type Action = SessionAction;
    ///     type Environment = SessionEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SessionState,
    ///         action: SessionAction,
    ///         env: &SessionEnvironment,
    ///     ) -> SmallVec<[Effect<SessionAction>; 4]> {
    ///         match action {
    ///             SessionAction::Logout => {
    ///                 *state = SessionState::default();
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates state in place and returns effect descriptions to be
        /// executed by the runtime.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Wrap an async block that produces no follow-up action
        #[must_use]
        pub fn fire_and_forget<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(async move {
                fut.await;
                None
            }))
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All time-dependent code takes a [`Clock`](environment::Clock) so tests can
/// pin timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
