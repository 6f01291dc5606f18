//! In-memory table backend.
//!
//! Implements [`TableBackend`] over process-local tables with the same
//! semantics as the hosted database: generated `id`, `created_at` and
//! `updated_at` columns, filters, ordering, limits and embedded relations.

use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use todolist_core::environment::Clock;
use todolist_core::query::compare_values;
use todolist_core::{BackendError, Filter, Select, TableBackend};

use crate::mocks::ManualClock;
use crate::test_time;

type Row = Map<String, Value>;

/// Backend operation, for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    /// `select`
    Select,
    /// `insert`
    Insert,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

impl BackendOp {
    const fn index(self) -> usize {
        match self {
            Self::Select => 0,
            Self::Insert => 1,
            Self::Update => 2,
            Self::Delete => 3,
        }
    }
}

struct Inner {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    clock: Arc<dyn Clock>,
    failure: Mutex<Option<BackendError>>,
    hide_written_rows: AtomicBool,
    calls: [AtomicUsize; 4],
}

/// In-memory [`TableBackend`].
///
/// Clones share the same tables.
///
/// # Example
///
/// ```
/// use todolist_testing::{BackendOp, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.seed_user("user1", "a@example.com", Some("Ada"));
/// assert_eq!(backend.rows("users").len(), 1);
/// assert_eq!(backend.calls(BackendOp::Select), 0);
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("tables", &self.lock_tables().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend whose clock starts at [`test_time`] and moves one
    /// second per generated timestamp, so insertion order is also
    /// `created_at` order.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(
            ManualClock::new(test_time()).with_auto_advance(Duration::from_secs(1)),
        ))
    }

    /// Empty backend stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(HashMap::new()),
                clock,
                failure: Mutex::new(None),
                hide_written_rows: AtomicBool::new(false),
                calls: Default::default(),
            }),
        }
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: BackendError) {
        *self.inner.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Stop failing.
    pub fn clear_failure(&self) {
        *self.inner.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// When set, inserts and updates still apply but return no row, as a
    /// row-level policy hiding the written row would.
    pub fn hide_written_rows(&self, hide: bool) {
        self.inner.hide_written_rows.store(hide, Ordering::SeqCst);
    }

    /// Number of calls of `op` so far, failed ones included.
    #[must_use]
    pub fn calls(&self, op: BackendOp) -> usize {
        self.inner.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Snapshot of a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock_tables().get(table).cloned().unwrap_or_default()
    }

    /// Append rows verbatim, without generating columns.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        self.lock_tables()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Add a user row that todos can reference through `owner_id`.
    pub fn seed_user(&self, id: &str, email: &str, full_name: Option<&str>) {
        let mut row = Row::new();
        row.insert("id".into(), Value::from(id));
        row.insert("email".into(), Value::from(email));
        row.insert(
            "full_name".into(),
            full_name.map_or(Value::Null, Value::from),
        );
        self.seed("users", [row]);
    }

    fn lock_tables(&self) -> MutexGuard<'_, HashMap<String, Vec<Row>>> {
        self.inner.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, op: BackendOp) -> Result<(), BackendError> {
        self.inner.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        self.inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map_or(Ok(()), Err)
    }

    fn timestamp(&self) -> Value {
        Value::String(
            self.inner
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        )
    }

    fn written(&self, row: Row) -> Option<Value> {
        (!self.inner.hide_written_rows.load(Ordering::SeqCst)).then(|| Value::Object(row))
    }

    fn run_select(&self, table: &str, select: &Select) -> Vec<Value> {
        let tables = self.lock_tables();
        let empty = Vec::new();
        let rows = tables.get(table).unwrap_or(&empty);

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| select.filters().iter().all(|f| f.matches(row)))
            .collect();

        matched.sort_by(|a, b| {
            select
                .ordering()
                .iter()
                .map(|order| {
                    let left = a.get(&order.column).unwrap_or(&Value::Null);
                    let right = b.get(&order.column).unwrap_or(&Value::Null);
                    let ordering = compare_values(left, right).unwrap_or(std::cmp::Ordering::Equal);
                    if order.ascending { ordering } else { ordering.reverse() }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let limit = select.row_limit().unwrap_or(usize::MAX);
        matched
            .into_iter()
            .take(limit)
            .map(|row| Value::Object(shape_row(&tables, row, select)))
            .collect()
    }
}

/// Apply projection and embeds to one matched row.
fn shape_row(tables: &HashMap<String, Vec<Row>>, row: &Row, select: &Select) -> Row {
    let mut shaped = if select.projected().is_empty() {
        row.clone()
    } else {
        select
            .projected()
            .iter()
            .map(|column| {
                (
                    column.clone(),
                    row.get(column).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    };

    for embed in select.embeds() {
        let key = row.get(&embed.foreign_key).unwrap_or(&Value::Null);
        let related = tables
            .get(&embed.table)
            .and_then(|rows| rows.iter().find(|r| r.get("id") == Some(key)))
            .map_or(Value::Null, |related| {
                Value::Object(
                    embed
                        .columns
                        .iter()
                        .map(|column| {
                            (
                                column.clone(),
                                related.get(column).cloned().unwrap_or(Value::Null),
                            )
                        })
                        .collect(),
                )
            });
        shaped.insert(embed.alias.clone(), related);
    }

    shaped
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|f| f.matches(row))
}

impl TableBackend for InMemoryBackend {
    async fn select(&self, table: &str, select: Select) -> Result<Vec<Value>, BackendError> {
        self.begin(BackendOp::Select)?;
        Ok(self.run_select(table, &select))
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Option<Value>, BackendError> {
        self.begin(BackendOp::Insert)?;

        if !row.contains_key("id") {
            row.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            let now = self.timestamp();
            row.insert("created_at".into(), now.clone());
            row.entry("updated_at").or_insert(now);
        }
        if !row.contains_key("updated_at") {
            row.insert("updated_at".into(), self.timestamp());
        }

        self.lock_tables()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(self.written(row))
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Row,
    ) -> Result<Option<Value>, BackendError> {
        self.begin(BackendOp::Update)?;

        let now = self.timestamp();
        let mut tables = self.lock_tables();
        let mut first = None;

        for row in tables
            .get_mut(table)
            .into_iter()
            .flatten()
            .filter(|row| matches_all(&filters, row))
        {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            row.insert("updated_at".into(), now.clone());
            if first.is_none() {
                first = Some(row.clone());
            }
        }
        drop(tables);

        Ok(first.and_then(|row| self.written(row)))
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<(), BackendError> {
        self.begin(BackendOp::Delete)?;

        if let Some(rows) = self.lock_tables().get_mut(table) {
            rows.retain(|row| !matches_all(&filters, row));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use todolist_core::Embed;

    fn object(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn insert_generates_id_and_timestamps() {
        let backend = InMemoryBackend::new();

        let row = backend
            .insert("todos", object(json!({ "title": "a" })))
            .await
            .unwrap()
            .unwrap();

        assert!(row["id"].as_str().is_some());
        assert_eq!(row["created_at"], "2025-01-01T00:00:00.000000Z");
        assert_eq!(row["created_at"], row["updated_at"]);
    }

    #[tokio::test]
    async fn update_patches_matching_rows_and_refreshes_updated_at() {
        let backend = InMemoryBackend::new();
        let row = backend
            .insert("todos", object(json!({ "id": "t1", "title": "a", "completed": false })))
            .await
            .unwrap()
            .unwrap();

        let updated = backend
            .update(
                "todos",
                vec![Filter::eq("id", "t1")],
                object(json!({ "completed": true })),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["title"], "a");
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["created_at"], row["created_at"]);
        assert_ne!(updated["updated_at"], row["updated_at"]);
    }

    #[tokio::test]
    async fn update_without_match_is_none() {
        let backend = InMemoryBackend::new();
        let result = backend
            .update("todos", vec![Filter::eq("id", "nope")], Row::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn embeds_join_related_rows() {
        let backend = InMemoryBackend::new();
        backend.seed_user("user1", "a@example.com", None);
        backend
            .insert("todos", object(json!({ "title": "a", "owner_id": "user1" })))
            .await
            .unwrap();
        backend
            .insert("todos", object(json!({ "title": "b", "owner_id": "ghost" })))
            .await
            .unwrap();

        let rows = backend
            .select(
                "todos",
                Select::all()
                    .embed(Embed::new("owner", "users", "owner_id", &["email", "full_name"]))
                    .order("title", true),
            )
            .await
            .unwrap();

        assert_eq!(rows[0]["owner"], json!({ "email": "a@example.com", "full_name": null }));
        assert_eq!(rows[1]["owner"], Value::Null);
    }

    #[tokio::test]
    async fn injected_failures_are_counted_and_cleared() {
        let backend = InMemoryBackend::new();
        backend.fail_with(BackendError::new("offline"));

        let err = backend.select("todos", Select::all()).await.unwrap_err();
        assert_eq!(err.message, "offline");

        backend.clear_failure();
        assert!(backend.select("todos", Select::all()).await.is_ok());
        assert_eq!(backend.calls(BackendOp::Select), 2);
    }

    #[tokio::test]
    async fn hidden_writes_still_apply() {
        let backend = InMemoryBackend::new();
        backend.hide_written_rows(true);

        let result = backend
            .insert("todos", object(json!({ "title": "a" })))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(backend.rows("todos").len(), 1);
    }

    #[tokio::test]
    async fn delete_of_missing_row_is_ok() {
        let backend = InMemoryBackend::new();
        backend
            .delete("todos", vec![Filter::eq("id", "missing")])
            .await
            .unwrap();
        assert_eq!(backend.calls(BackendOp::Delete), 1);
    }
}
