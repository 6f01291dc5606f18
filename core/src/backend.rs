//! Backend capability.
//!
//! [`TableBackend`] is the one seam between this workspace and the hosted
//! database. Production code uses the PostgREST client; tests use the
//! in-memory backend from `todolist-testing`.

use crate::query::{Filter, Select};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// Failure reported by a backend.
///
/// Mirrors the error body of the hosted database: a message plus optional
/// `code`, `details` and `hint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable message
    pub message: String,
    /// Backend-specific code (for example a Postgres SQLSTATE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Extra detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl BackendError {
    /// Error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    /// Attach a backend code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Table-addressed access to the hosted database.
///
/// Every call either fails with a [`BackendError`] or succeeds; a successful
/// write that touched zero rows returns `Ok(None)`.
///
/// # Example
///
/// ```ignore
/// let rows = backend
///     .select("todos", Select::all().eq("owner_id", "user1"))
///     .await?;
/// ```
pub trait TableBackend: Send + Sync {
    /// Run a read.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure unchanged.
    fn select(
        &self,
        table: &str,
        select: Select,
    ) -> impl Future<Output = Result<Vec<Value>, BackendError>> + Send;

    /// Insert one row and read it back.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure unchanged.
    fn insert(
        &self,
        table: &str,
        row: Map<String, Value>,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send;

    /// Patch the rows matching `filters` and read the first one back.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure unchanged.
    fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Map<String, Value>,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send;

    /// Delete the rows matching `filters`. Zero matches is not an error.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure unchanged.
    fn delete(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

impl<B: TableBackend> TableBackend for std::sync::Arc<B> {
    fn select(
        &self,
        table: &str,
        select: Select,
    ) -> impl Future<Output = Result<Vec<Value>, BackendError>> + Send {
        (**self).select(table, select)
    }

    fn insert(
        &self,
        table: &str,
        row: Map<String, Value>,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send {
        (**self).insert(table, row)
    }

    fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Map<String, Value>,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send {
        (**self).update(table, filters, patch)
    }

    fn delete(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).delete(table, filters)
    }
}
