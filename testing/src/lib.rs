//! # Todolist Testing
//!
//! Testing utilities for the todolist workspace.
//!
//! This crate provides:
//! - [`InMemoryBackend`]: a [`TableBackend`](todolist_core::TableBackend)
//!   over in-process tables, with failure injection and call counters
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Todo fixtures and proptest strategies
//! - [`ReducerTest`] for Given-When-Then reducer tests
//!
//! ## Example
//!
//! ```ignore
//! use todolist_testing::InMemoryBackend;
//! use todolist_core::{RecordStore, TodoService};
//!
//! #[tokio::test]
//! async fn creates_todo() {
//!     let service = TodoService::new(RecordStore::new(InMemoryBackend::new()));
//!     let todo = service.create(fixtures::create_todo("user1")).await.unwrap();
//!     assert!(!todo.completed);
//! }
//! ```

use chrono::{DateTime, Utc};
use todolist_core::environment::Clock;

/// In-memory table backend
pub mod backend;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todolist_testing::mocks::FixedClock;
    /// use todolist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock moved by hand, optionally stepping forward on every read.
    ///
    /// Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use todolist_testing::mocks::ManualClock;
    /// use todolist_core::environment::Clock;
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::new(todolist_testing::test_time())
    ///     .with_auto_advance(Duration::from_secs(1));
    /// assert!(clock.now() < clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
        step: chrono::Duration,
    }

    impl ManualClock {
        /// Start at `time`, not moving on its own.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
                step: chrono::Duration::zero(),
            }
        }

        /// Step forward by `step` after every read.
        #[must_use]
        pub fn with_auto_advance(mut self, step: Duration) -> Self {
            self.step = chrono::Duration::from_std(step).unwrap_or_else(|_| chrono::Duration::zero());
            self
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let by = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            let now = *time;
            *time += self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::test_time())
    }
}

/// Todo fixtures
pub mod fixtures {
    use super::test_time;
    use todolist_core::{CreateTodo, OwnerId, Todo, TodoId};

    /// Creation request titled "Test Todo" for `owner`.
    #[must_use]
    pub fn create_todo(owner: &str) -> CreateTodo {
        CreateTodo::new("Test Todo", OwnerId::new(owner))
    }

    /// A persisted, open todo stamped with [`test_time`].
    #[must_use]
    pub fn todo(id: &str, owner: &str, title: &str) -> Todo {
        Todo {
            id: TodoId::new(id),
            title: title.to_string(),
            completed: false,
            owner_id: OwnerId::new(owner),
            created_at: test_time(),
            updated_at: test_time(),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use todolist_core::UpdateTodo;

    /// Non-empty printable titles.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 ]{1,24}"
    }

    /// One of a handful of owner ids, so generated rows collide on owner.
    pub fn arb_owner() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["user1", "user2", "user3"]).prop_map(|owner| owner.to_string())
    }

    /// Arbitrary partial updates, including the empty one.
    pub fn arb_update() -> impl Strategy<Value = UpdateTodo> {
        (prop::option::of(arb_title()), prop::option::of(any::<bool>()))
            .prop_map(|(title, completed)| UpdateTodo { title, completed })
    }
}

/// Start of time for every deterministic clock: 2025-01-01 00:00:00 UTC.
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

// Re-export commonly used items
pub use backend::{BackendOp, InMemoryBackend};
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::ReducerTest;
