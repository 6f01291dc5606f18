//! # Todolist Runtime
//!
//! Runtime pieces that sit between the domain service and its consumers.
//!
//! ## Core Components
//!
//! - **Store**: manages reducer state and executes effects, feeding produced
//!   actions back into the reducer
//! - **Query cache**: key-addressed cache with invalidation and subscriber
//!   notification ([`query::QueryCache`])
//! - **Hooks**: [`TodosQuery`] and [`DataQuery`], cached reads plus
//!   fire-and-forget mutations that invalidate their key on success
//! - **Error boundary**: [`ErrorBoundary`], a Healthy/Failed state machine
//!   that turns panics and errors into a fallback panel
//!
//! ## Example
//!
//! ```ignore
//! use todolist_runtime::{QueryCache, TodosQuery};
//!
//! let todos = TodosQuery::new(service, QueryCache::new(), OwnerId::new("user1"));
//! todos.load().await;
//!
//! let handle = todos.create(CreateTodo::new("Test Todo", OwnerId::new("user1")));
//! handle.outcome().await?;
//! ```

/// Error boundary state machine and fallback rendering
pub mod boundary;

/// Generic per-table data hook
pub mod data;

/// Mutation status tracking shared by the hooks
pub mod mutation;

/// Key-addressed query cache
pub mod query;

/// Reducer store and effect runner
pub mod store;

/// Todo hook
pub mod todos;

/// [`Store`] errors
pub mod error {
    use thiserror::Error;

    /// Why a [`Store`](crate::Store) call failed
    #[derive(Error, Debug)]
    pub enum StoreRuntimeError {
        /// `send` after `shutdown`
        #[error("store no longer accepts actions")]
        ShutdownInProgress,

        /// Effects outlived the shutdown deadline
        #[error("{0} effects still running at the shutdown deadline")]
        ShutdownTimeout(usize),
    }
}

pub use boundary::{
    BoundaryAction, BoundaryEnvironment, BoundaryReducer, BoundaryState, CaughtError, ErrorBoundary,
    FallbackPanel, Rendered,
};
pub use data::DataQuery;
pub use error::StoreRuntimeError;
pub use mutation::{MutationHandle, MutationStatus};
pub use query::{QueryCache, QueryKey, QueryState};
pub use store::{EffectHandle, Store};
pub use todos::{TodosQuery, TodosSnapshot};
