//! Generic record store.
//!
//! A typed pass-through over a [`TableBackend`]. It only (de)serializes rows:
//! backend failures come back unchanged inside [`StoreError::Backend`] and
//! "zero rows" comes back as `None`. Deciding what either means is left to
//! the domain services.

use crate::backend::{BackendError, TableBackend};
use crate::error::DomainError;
use crate::query::{Filter, Select};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Primary key column shared by every table.
pub const ID_COLUMN: &str = "id";

/// Errors surfaced by [`RecordStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend reported a failure.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// The outgoing row could not be serialized.
    #[error("Failed to encode row for {table}: {source}")]
    Encode {
        /// Target table
        table: String,
        /// Serializer error
        source: serde_json::Error,
    },

    /// The outgoing row did not serialize to a JSON object.
    #[error("Row for {table} is not an object")]
    NotAnObject {
        /// Target table
        table: String,
    },

    /// A returned row did not match the expected shape.
    #[error("Failed to decode row from {table}: {source}")]
    Decode {
        /// Source table
        table: String,
        /// Deserializer error
        source: serde_json::Error,
    },
}

impl From<BackendError> for DomainError {
    fn from(error: BackendError) -> Self {
        Self::bad_request(error.message)
    }
}

impl From<StoreError> for DomainError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Backend(backend) => backend.into(),
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// Typed access to any table of a backend.
///
/// Cloning is cheap; clones share the backend.
///
/// # Example
///
/// ```ignore
/// let store = RecordStore::new(backend);
/// let todos: Vec<Todo> = store
///     .query("todos", |select| select.eq("owner_id", "user1"))
///     .await?;
/// ```
#[derive(Debug)]
pub struct RecordStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for RecordStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: TableBackend> RecordStore<B> {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wrap an already shared backend.
    #[must_use]
    pub const fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a read refined by `shape`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the backend fails, [`StoreError::Decode`]
    /// when a row does not decode as `T`.
    pub async fn query<T, F>(&self, table: &str, shape: F) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
        F: FnOnce(Select) -> Select + Send,
    {
        let select = shape(Select::all());
        tracing::trace!(table, filters = select.filters().len(), "Querying table");

        let rows = self.backend.select(table, select).await?;
        rows.into_iter().map(|row| decode(table, row)).collect()
    }

    /// Insert a row and return it as re-read by the backend.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the backend fails; encode and decode
    /// errors when `row` or the result do not fit.
    pub async fn insert<T, P>(&self, table: &str, row: &P) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync + ?Sized,
    {
        let row = encode(table, row)?;
        tracing::trace!(table, "Inserting row");

        self.backend
            .insert(table, row)
            .await?
            .map(|value| decode(table, value))
            .transpose()
    }

    /// Patch the row with primary key `id`. `None` means no row matched.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the backend fails; encode and decode
    /// errors when `patch` or the result do not fit.
    pub async fn update<T, P>(&self, table: &str, id: &str, patch: &P) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync + ?Sized,
    {
        let patch = encode(table, patch)?;
        tracing::trace!(table, id, "Updating row");

        self.backend
            .update(table, vec![Filter::eq(ID_COLUMN, id)], patch)
            .await?
            .map(|value| decode(table, value))
            .transpose()
    }

    /// Delete the row with primary key `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the backend fails.
    pub async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        tracing::trace!(table, id, "Deleting row");

        self.backend
            .delete(table, vec![Filter::eq(ID_COLUMN, id)])
            .await?;
        Ok(())
    }

    /// Read the row with primary key `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the backend fails, [`StoreError::Decode`]
    /// when the row does not decode as `T`.
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let select = Select::all().eq(ID_COLUMN, id).limit(1);
        let rows = self.backend.select(table, select).await?;

        rows.into_iter()
            .next()
            .map(|row| decode(table, row))
            .transpose()
    }
}

fn encode<P: Serialize + ?Sized>(table: &str, row: &P) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::NotAnObject {
            table: table.to_string(),
        }),
        Err(source) => Err(StoreError::Encode {
            table: table.to_string(),
            source,
        }),
    }
}

fn decode<T: DeserializeOwned>(table: &str, row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|source| StoreError::Decode {
        table: table.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend that records calls and replays canned results.
    #[derive(Default)]
    struct ScriptedBackend {
        rows: Vec<Value>,
        write_result: Option<Value>,
        fail_with: Option<BackendError>,
        seen_filters: Mutex<Vec<Filter>>,
    }

    impl ScriptedBackend {
        fn outcome<T>(&self, ok: T) -> Result<T, BackendError> {
            self.fail_with.clone().map_or(Ok(ok), Err)
        }
    }

    impl TableBackend for ScriptedBackend {
        async fn select(&self, _table: &str, select: Select) -> Result<Vec<Value>, BackendError> {
            self.seen_filters
                .lock()
                .unwrap()
                .extend(select.filters().iter().cloned());
            self.outcome(self.rows.clone())
        }

        async fn insert(
            &self,
            _table: &str,
            _row: Map<String, Value>,
        ) -> Result<Option<Value>, BackendError> {
            self.outcome(self.write_result.clone())
        }

        async fn update(
            &self,
            _table: &str,
            filters: Vec<Filter>,
            _patch: Map<String, Value>,
        ) -> Result<Option<Value>, BackendError> {
            self.seen_filters.lock().unwrap().extend(filters);
            self.outcome(self.write_result.clone())
        }

        async fn delete(&self, _table: &str, filters: Vec<Filter>) -> Result<(), BackendError> {
            self.seen_filters.lock().unwrap().extend(filters);
            self.outcome(())
        }
    }

    #[tokio::test]
    async fn backend_errors_pass_through_unchanged() {
        let failure = BackendError::new("relation does not exist").with_code("42P01");
        let store = RecordStore::new(ScriptedBackend {
            fail_with: Some(failure.clone()),
            ..ScriptedBackend::default()
        });

        let err = store.query::<Value, _>("todos", |s| s).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(ref inner) if *inner == failure));
    }

    #[tokio::test]
    async fn zero_row_writes_are_none() {
        let store = RecordStore::new(ScriptedBackend::default());

        let inserted: Option<Value> = store.insert("todos", &json!({ "a": 1 })).await.unwrap();
        let updated: Option<Value> = store.update("todos", "x", &json!({ "a": 2 })).await.unwrap();

        assert!(inserted.is_none());
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn non_object_rows_are_rejected_before_the_backend() {
        let store = RecordStore::new(ScriptedBackend::default());

        let err = store
            .insert::<Value, _>("todos", &json!(["not", "an", "object"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn id_operations_filter_on_primary_key() {
        let backend = ScriptedBackend {
            rows: vec![json!({ "id": "t1" })],
            ..ScriptedBackend::default()
        };
        let store = RecordStore::new(backend);

        let row: Option<Value> = store.get_by_id("todos", "t1").await.unwrap();
        store.delete("todos", "t1").await.unwrap();

        assert_eq!(row.unwrap()["id"], "t1");
        let seen = store.backend().seen_filters.lock().unwrap().clone();
        assert_eq!(seen, vec![Filter::eq("id", "t1"), Filter::eq("id", "t1")]);
    }

    #[tokio::test]
    async fn undecodable_rows_surface_as_decode_errors() {
        #[derive(Debug, serde::Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            title: String,
        }

        let store = RecordStore::new(ScriptedBackend {
            rows: vec![json!({ "id": "t1" })],
            ..ScriptedBackend::default()
        });

        let err = store.query::<Strict, _>("todos", |s| s).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn store_errors_convert_to_bad_request() {
        let domain: DomainError = StoreError::Backend(BackendError::new("boom")).into();
        assert_eq!(domain.status(), 400);
        assert_eq!(domain.message(), "boom");
    }
}
