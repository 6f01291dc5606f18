//! Generic data hook over any table.

use crate::mutation::{MutationHandle, StatusSender, spawn_mutation, status_channel};
use crate::query::{QueryCache, QueryKey, QueryState};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use todolist_core::{DomainError, RecordStore, Select, TableBackend};
use tokio::sync::watch;

/// Scope used by table-wide hooks.
pub const ALL_ROWS: &str = "*";

type SharedShape = Arc<dyn Fn(Select) -> Select + Send + Sync>;

/// Cached rows of one table, keyed `(table, "*")`.
///
/// Store failures become [`DomainError`]s here. A write that returns no row
/// is `INTERNAL_ERROR` for inserts and `NOT_FOUND` for updates.
///
/// # Example
///
/// ```ignore
/// let users: DataQuery<User, _> = DataQuery::new(store, QueryCache::new(), "users")
///     .with_shape(|select| select.order("email", true));
/// users.load().await;
/// ```
pub struct DataQuery<T, B> {
    store: RecordStore<B>,
    cache: QueryCache<Vec<T>>,
    table: String,
    key: QueryKey,
    shape: Option<SharedShape>,
    state: Arc<watch::Sender<QueryState<T>>>,
    creating: StatusSender,
    updating: StatusSender,
    deleting: StatusSender,
}

impl<T, B> Clone for DataQuery<T, B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            table: self.table.clone(),
            key: self.key.clone(),
            shape: self.shape.clone(),
            state: Arc::clone(&self.state),
            creating: Arc::clone(&self.creating),
            updating: Arc::clone(&self.updating),
            deleting: Arc::clone(&self.deleting),
        }
    }
}

impl<T, B> std::fmt::Debug for DataQuery<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataQuery")
            .field("key", &self.key)
            .field("shaped", &self.shape.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, B> DataQuery<T, B>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    B: TableBackend + 'static,
{
    /// Hook for every row of `table`.
    #[must_use]
    pub fn new(store: RecordStore<B>, cache: QueryCache<Vec<T>>, table: impl Into<String>) -> Self {
        let table = table.into();
        let key = QueryKey::new(table.clone(), ALL_ROWS);
        Self {
            store,
            cache,
            table,
            key,
            shape: None,
            state: Arc::new(watch::Sender::new(QueryState::default())),
            creating: status_channel(),
            updating: status_channel(),
            deleting: status_channel(),
        }
    }

    /// Refine every read with `shape`.
    #[must_use]
    pub fn with_shape<F>(mut self, shape: F) -> Self
    where
        F: Fn(Select) -> Select + Send + Sync + 'static,
    {
        self.shape = Some(Arc::new(shape));
        self
    }

    /// Cache key of this hook.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current read state.
    #[must_use]
    pub fn snapshot(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    /// Follow the read state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Whether any mutation of this hook is running.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        [&self.creating, &self.updating, &self.deleting]
            .iter()
            .any(|status| status.borrow().is_pending())
    }

    /// Read through the cache and publish the result.
    pub async fn load(&self) -> QueryState<T> {
        let store = self.store.clone();
        let table = self.table.clone();
        let shape = self.shape.clone();

        let result = self
            .cache
            .fetch_with(self.key.clone(), || async move {
                store
                    .query(&table, move |select| match shape {
                        Some(shape) => shape(select),
                        None => select,
                    })
                    .await
                    .map_err(DomainError::from)
            })
            .await;

        self.state.send_modify(|state| {
            state.is_loading = false;
            match result {
                Ok(items) => {
                    state.items = items;
                    state.error = None;
                },
                Err(error) => state.error = Some(error),
            }
        });
        self.state.borrow().clone()
    }

    /// Start inserting `row`.
    pub fn create<P>(&self, row: P) -> MutationHandle<T>
    where
        P: Serialize + Send + Sync + 'static,
    {
        let store = self.store.clone();
        let table = self.table.clone();
        spawn_mutation("create", &self.creating, &self.cache, &self.key, async move {
            store
                .insert(&table, &row)
                .await
                .map_err(DomainError::from)?
                .ok_or_else(|| DomainError::internal(Some("Failed to create record")))
        })
    }

    /// Start patching row `id`.
    pub fn update<P>(&self, id: impl Into<String>, patch: P) -> MutationHandle<T>
    where
        P: Serialize + Send + Sync + 'static,
    {
        let store = self.store.clone();
        let table = self.table.clone();
        let id = id.into();
        spawn_mutation("update", &self.updating, &self.cache, &self.key, async move {
            store
                .update(&table, &id, &patch)
                .await
                .map_err(DomainError::from)?
                .ok_or_else(|| DomainError::not_found(Some("Record not found")))
        })
    }

    /// Start deleting row `id`.
    pub fn delete(&self, id: impl Into<String>) -> MutationHandle<()> {
        let store = self.store.clone();
        let table = self.table.clone();
        let id = id.into();
        spawn_mutation("delete", &self.deleting, &self.cache, &self.key, async move {
            store.delete(&table, &id).await.map_err(DomainError::from)
        })
    }
}
