//! Todo record types.
//!
//! `id` and `created_at` never change after creation and `owner_id` is set
//! once by [`CreateTodo`]. [`UpdateTodo`] can only carry the mutable fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Todo identifier, generated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the user owning a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Backend-generated identifier
    pub id: TodoId,
    /// Title shown to the user
    pub title: String,
    /// Completion flag
    pub completed: bool,
    /// Owning user
    pub owner_id: OwnerId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTodo {
    /// Title of the new todo
    pub title: String,
    /// Owner of the new todo
    pub owner_id: OwnerId,
}

impl CreateTodo {
    /// Build a creation request.
    #[must_use]
    pub fn new(title: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            title: title.into(),
            owner_id,
        }
    }
}

/// Row sent to the backend on creation: the caller's fields plus defaults.
#[derive(Debug, Serialize)]
pub(crate) struct NewTodoRow<'a> {
    #[serde(flatten)]
    pub dto: &'a CreateTodo,
    pub completed: bool,
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTodo {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodo {
    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the completion flag.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Whether the update carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

/// Denormalized owner projection produced by a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    /// Owner email
    pub email: String,
    /// Owner display name
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A todo joined with its owner. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoWithOwner {
    /// The todo itself
    #[serde(flatten)]
    pub todo: Todo,
    /// The owner projection
    pub owner: OwnerInfo,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_row_adds_completed_false() {
        let dto = CreateTodo::new("Test Todo", OwnerId::new("user1"));
        let row = serde_json::to_value(NewTodoRow {
            dto: &dto,
            completed: false,
        })
        .unwrap();

        assert_eq!(
            row,
            json!({ "title": "Test Todo", "owner_id": "user1", "completed": false })
        );
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let patch = serde_json::to_value(UpdateTodo::default().completed(true)).unwrap();
        assert_eq!(patch, json!({ "completed": true }));

        let empty = serde_json::to_value(UpdateTodo::default()).unwrap();
        assert_eq!(empty, json!({}));
        assert!(UpdateTodo::default().is_empty());
    }

    #[test]
    fn joined_row_flattens_todo_fields() {
        let row = json!({
            "id": "t1",
            "title": "Write docs",
            "completed": false,
            "owner_id": "user1",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "owner": { "email": "a@example.com", "full_name": null }
        });

        let joined: TodoWithOwner = serde_json::from_value(row).unwrap();
        assert_eq!(joined.todo.id.as_str(), "t1");
        assert_eq!(joined.owner.email, "a@example.com");
        assert!(joined.owner.full_name.is_none());
    }
}
