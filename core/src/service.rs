//! Todo domain service.
//!
//! The single place where store failures become [`DomainError`]s:
//!
//! | Situation | Result |
//! |-----------|--------|
//! | backend or codec failure | `BAD_REQUEST` with the underlying message |
//! | failure with an empty message | `INTERNAL_ERROR` naming the operation |
//! | insert returned no row | `INTERNAL_ERROR` "Failed to create todo" |
//! | update or lookup matched no row | `NOT_FOUND` "Todo not found" |
//! | delete matched no row | success |

use crate::backend::TableBackend;
use crate::error::DomainError;
use crate::query::{Embed, Select};
use crate::store::{RecordStore, StoreError};
use crate::todo::{CreateTodo, NewTodoRow, OwnerId, Todo, TodoId, TodoWithOwner, UpdateTodo};
use serde_json::{Map, Value};

/// Table holding todos.
pub const TODOS_TABLE: &str = "todos";

/// Table holding the owners referenced by `owner_id`.
pub const USERS_TABLE: &str = "users";

/// Caller-supplied refinement of a read.
pub type QueryShape = Box<dyn FnOnce(Select) -> Select + Send>;

const NOT_FOUND_MESSAGE: &str = "Todo not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Delete,
    FindById,
    FindByOwner,
    FindWithOwnerInfo,
}

impl Operation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::FindById => "find_by_id",
            Self::FindByOwner => "find_by_owner",
            Self::FindWithOwnerInfo => "find_with_owner_info",
        }
    }

    const fn canned_message(self) -> &'static str {
        match self {
            Self::Create => "Failed to create todo",
            Self::Update => "Failed to update todo",
            Self::Delete => "Failed to delete todo",
            Self::FindById => "Failed to fetch todo",
            Self::FindByOwner => "Failed to fetch todos",
            Self::FindWithOwnerInfo => "Failed to fetch todos with owners",
        }
    }
}

/// Unexpected-failure fallback shared by every operation.
fn translate(operation: Operation, error: StoreError) -> DomainError {
    let message = error.to_string();
    tracing::warn!(
        table = TODOS_TABLE,
        operation = operation.as_str(),
        error = %message,
        "Todo operation failed"
    );

    if message.trim().is_empty() {
        DomainError::internal(Some(operation.canned_message()))
    } else {
        DomainError::bad_request(message)
    }
}

/// Todo operations over a [`RecordStore`].
///
/// Cloning is cheap; clones share the backend.
#[derive(Debug)]
pub struct TodoService<B> {
    store: RecordStore<B>,
}

impl<B> Clone for TodoService<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<B: TableBackend> TodoService<B> {
    /// Build the service over a store.
    #[must_use]
    pub const fn new(store: RecordStore<B>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    /// Create a todo. New todos always start with `completed = false`.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` when the backend fails, `INTERNAL_ERROR` when the insert
    /// returned no row.
    pub async fn create(&self, dto: CreateTodo) -> Result<Todo, DomainError> {
        let row = NewTodoRow {
            dto: &dto,
            completed: false,
        };

        let todo: Todo = self
            .store
            .insert(TODOS_TABLE, &row)
            .await
            .map_err(|e| translate(Operation::Create, e))?
            .ok_or_else(|| DomainError::internal(Some(Operation::Create.canned_message())))?;

        tracing::debug!(todo_id = %todo.id, owner_id = %todo.owner_id, "Todo created");
        Ok(todo)
    }

    /// Apply the fields present in `dto` to the todo `id`.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` when the backend fails, `NOT_FOUND` when no todo has
    /// this id.
    pub async fn update(&self, id: &TodoId, dto: UpdateTodo) -> Result<Todo, DomainError> {
        let todo: Todo = self
            .store
            .update(TODOS_TABLE, id.as_str(), &dto)
            .await
            .map_err(|e| translate(Operation::Update, e))?
            .ok_or_else(|| DomainError::not_found(Some(NOT_FOUND_MESSAGE)))?;

        tracing::debug!(todo_id = %todo.id, "Todo updated");
        Ok(todo)
    }

    /// Delete the todo `id`. Deleting an unknown id succeeds.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` when the backend fails.
    pub async fn delete(&self, id: &TodoId) -> Result<(), DomainError> {
        self.store
            .delete(TODOS_TABLE, id.as_str())
            .await
            .map_err(|e| translate(Operation::Delete, e))?;

        tracing::debug!(todo_id = %id, "Todo deleted");
        Ok(())
    }

    /// Fetch one todo.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` when the backend fails, `NOT_FOUND` when no todo has
    /// this id.
    pub async fn find_by_id(&self, id: &TodoId) -> Result<Todo, DomainError> {
        self.store
            .get_by_id(TODOS_TABLE, id.as_str())
            .await
            .map_err(|e| translate(Operation::FindById, e))?
            .ok_or_else(|| DomainError::not_found(Some(NOT_FOUND_MESSAGE)))
    }

    /// All todos of `owner_id`, newest first. No match is an empty list.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` when the backend fails.
    pub async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Todo>, DomainError> {
        let owner = owner_id.as_str().to_string();

        self.store
            .query(TODOS_TABLE, move |select| {
                select.eq("owner_id", owner).order("created_at", false)
            })
            .await
            .map_err(|e| translate(Operation::FindByOwner, e))
    }

    /// Todos joined with their owner's `email` and `full_name`, optionally
    /// refined by `shape`.
    ///
    /// # Errors
    ///
    /// `BAD_REQUEST` "Failed to fetch todos with owners" when the backend
    /// fails; the backend message is kept under the `cause` detail.
    pub async fn find_with_owner_info(
        &self,
        shape: Option<QueryShape>,
    ) -> Result<Vec<TodoWithOwner>, DomainError> {
        let result = self
            .store
            .query(TODOS_TABLE, move |select| {
                let select = select.embed(owner_embed());
                match shape {
                    Some(shape) => shape(select),
                    None => select,
                }
            })
            .await;

        result.map_err(|error| {
            let cause = translate(Operation::FindWithOwnerInfo, error);
            let mut details = Map::new();
            details.insert("cause".to_string(), Value::String(cause.message().to_string()));
            DomainError::bad_request(Operation::FindWithOwnerInfo.canned_message())
                .with_details(details)
        })
    }
}

/// Owner projection joined by [`TodoService::find_with_owner_info`].
#[must_use]
pub fn owner_embed() -> Embed {
    Embed::new("owner", USERS_TABLE, "owner_id", &["email", "full_name"])
}
