//! Todo endpoints.
//!
//! ```text
//! POST   /api/todos                      create        201 + todo
//! GET    /api/todos?owner_id=..          by owner      newest first
//! GET    /api/todos/with-owners          joined list   ?completed= filter
//! GET    /api/todos/:id                  one todo
//! PATCH  /api/todos/:id                  partial update
//! DELETE /api/todos/:id                  delete        204
//! ```

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use todolist_core::service::QueryShape;
use todolist_core::{CreateTodo, OwnerId, TableBackend, Todo, TodoId, TodoWithOwner, UpdateTodo};

/// Query of `GET /api/todos`.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// Owner whose todos to list.
    pub owner_id: String,
}

/// Query of `GET /api/todos/with-owners`.
#[derive(Debug, Default, Deserialize)]
pub struct WithOwnersQuery {
    /// Only todos with this completion flag.
    pub completed: Option<bool>,
}

impl WithOwnersQuery {
    fn shape(self) -> Option<QueryShape> {
        self.completed.map(|completed| {
            Box::new(move |select: todolist_core::Select| select.eq("completed", completed))
                as QueryShape
        })
    }
}

/// Create a todo for `owner_id`.
///
/// # Errors
///
/// `BAD_REQUEST` for a malformed body or a backend failure.
pub async fn create_todo<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    payload: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), AppError>
where
    B: TableBackend + 'static,
{
    let Json(dto) = payload?;
    let todo = state.todos.create(dto).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// Todos of one owner, newest first.
///
/// # Errors
///
/// `BAD_REQUEST` without `owner_id` or on backend failure.
pub async fn list_todos<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<Vec<Todo>>, AppError>
where
    B: TableBackend + 'static,
{
    let Query(query) = query?;
    let todos = state.todos.find_by_owner(&OwnerId::new(query.owner_id)).await?;
    Ok(Json(todos))
}

/// Todos joined with their owner.
///
/// # Errors
///
/// `BAD_REQUEST` "Failed to fetch todos with owners" on backend failure.
pub async fn list_todos_with_owners<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    query: Result<Query<WithOwnersQuery>, QueryRejection>,
) -> Result<Json<Vec<TodoWithOwner>>, AppError>
where
    B: TableBackend + 'static,
{
    let Query(query) = query?;
    let todos = state.todos.find_with_owner_info(query.shape()).await?;
    Ok(Json(todos))
}

/// One todo.
///
/// # Errors
///
/// `NOT_FOUND` for an unknown id.
pub async fn get_todo<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Todo>, AppError>
where
    B: TableBackend + 'static,
{
    let Path(id) = id?;
    let todo = state.todos.find_by_id(&TodoId::new(id)).await?;
    Ok(Json(todo))
}

/// Apply `{title?, completed?}` to a todo.
///
/// # Errors
///
/// `NOT_FOUND` for an unknown id, `BAD_REQUEST` for a malformed body.
pub async fn update_todo<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTodo>, JsonRejection>,
) -> Result<Json<Todo>, AppError>
where
    B: TableBackend + 'static,
{
    let Path(id) = id?;
    let Json(dto) = payload?;
    let todo = state.todos.update(&TodoId::new(id), dto).await?;
    Ok(Json(todo))
}

/// Delete a todo. Unknown ids are not an error.
///
/// # Errors
///
/// `BAD_REQUEST` on backend failure.
pub async fn delete_todo<B, A, L>(
    State(state): State<AppState<B, A, L>>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, AppError>
where
    B: TableBackend + 'static,
{
    let Path(id) = id?;
    state.todos.delete(&TodoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
