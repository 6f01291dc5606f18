//! Todo hook: the owner's todos as reactive state plus mutations.

use crate::mutation::{MutationHandle, MutationStatus, StatusSender, spawn_mutation, status_channel};
use crate::query::{QueryCache, QueryKey, QueryState};
use std::sync::Arc;
use todolist_core::service::TODOS_TABLE;
use todolist_core::{
    CreateTodo, DomainError, OwnerId, TableBackend, Todo, TodoId, TodoService, UpdateTodo,
};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Everything a view of one owner's todos renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct TodosSnapshot {
    /// The owner's todos, newest first.
    pub items: Vec<Todo>,
    /// `true` until the first read finishes.
    pub is_loading: bool,
    /// Error of the last read.
    pub error: Option<DomainError>,
    /// A create is running.
    pub is_creating: bool,
    /// An update is running.
    pub is_updating: bool,
    /// A delete is running.
    pub is_deleting: bool,
}

/// Cached todos of one owner, keyed `("todos", owner_id)`.
///
/// Every successful mutation invalidates the key, so the next
/// [`load`](Self::load) re-reads. Clones share state and statuses.
///
/// # Example
///
/// ```ignore
/// let todos = TodosQuery::new(service, cache, OwnerId::new("user1"));
/// let refresher = todos.spawn_auto_refresh();
///
/// todos.load().await;
/// todos.create(CreateTodo::new("Test Todo", OwnerId::new("user1")));
/// ```
pub struct TodosQuery<B> {
    service: TodoService<B>,
    cache: QueryCache<Vec<Todo>>,
    owner_id: OwnerId,
    key: QueryKey,
    state: Arc<watch::Sender<QueryState<Todo>>>,
    creating: StatusSender,
    updating: StatusSender,
    deleting: StatusSender,
}

impl<B> Clone for TodosQuery<B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cache: self.cache.clone(),
            owner_id: self.owner_id.clone(),
            key: self.key.clone(),
            state: Arc::clone(&self.state),
            creating: Arc::clone(&self.creating),
            updating: Arc::clone(&self.updating),
            deleting: Arc::clone(&self.deleting),
        }
    }
}

impl<B> std::fmt::Debug for TodosQuery<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodosQuery")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<B: TableBackend + 'static> TodosQuery<B> {
    /// Hook for `owner_id`'s todos. Nothing is read until [`load`](Self::load).
    #[must_use]
    pub fn new(service: TodoService<B>, cache: QueryCache<Vec<Todo>>, owner_id: OwnerId) -> Self {
        let key = QueryKey::new(TODOS_TABLE, owner_id.as_str());
        Self {
            service,
            cache,
            owner_id,
            key,
            state: Arc::new(watch::Sender::new(QueryState::default())),
            creating: status_channel(),
            updating: status_channel(),
            deleting: status_channel(),
        }
    }

    /// Cache key of this hook.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current read state and mutation flags.
    #[must_use]
    pub fn snapshot(&self) -> TodosSnapshot {
        let state = self.state.borrow().clone();
        TodosSnapshot {
            items: state.items,
            is_loading: state.is_loading,
            error: state.error,
            is_creating: self.creating.borrow().is_pending(),
            is_updating: self.updating.borrow().is_pending(),
            is_deleting: self.deleting.borrow().is_pending(),
        }
    }

    /// Follow the read state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<QueryState<Todo>> {
        self.state.subscribe()
    }

    /// Read through the cache and publish the result.
    ///
    /// A failed read keeps the previous items and records the error.
    pub async fn load(&self) -> QueryState<Todo> {
        let service = self.service.clone();
        let owner_id = self.owner_id.clone();
        let result = self
            .cache
            .fetch_with(self.key.clone(), || async move {
                service.find_by_owner(&owner_id).await
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

    /// Start creating a todo.
    pub fn create(&self, dto: CreateTodo) -> MutationHandle<Todo> {
        let service = self.service.clone();
        spawn_mutation("create", &self.creating, &self.cache, &self.key, async move {
            service.create(dto).await
        })
    }

    /// Start updating todo `id`.
    pub fn update(&self, id: TodoId, dto: UpdateTodo) -> MutationHandle<Todo> {
        let service = self.service.clone();
        spawn_mutation("update", &self.updating, &self.cache, &self.key, async move {
            service.update(&id, dto).await
        })
    }

    /// Start deleting todo `id`.
    pub fn delete(&self, id: TodoId) -> MutationHandle<()> {
        let service = self.service.clone();
        spawn_mutation("delete", &self.deleting, &self.cache, &self.key, async move {
            service.delete(&id).await
        })
    }

    /// Status of the latest create.
    #[must_use]
    pub fn create_status(&self) -> MutationStatus {
        self.creating.borrow().clone()
    }

    /// Status of the latest update.
    #[must_use]
    pub fn update_status(&self) -> MutationStatus {
        self.updating.borrow().clone()
    }

    /// Status of the latest delete.
    #[must_use]
    pub fn delete_status(&self) -> MutationStatus {
        self.deleting.borrow().clone()
    }

    /// Re-read whenever this hook's key is invalidated. Abort the handle to stop.
    pub fn spawn_auto_refresh(&self) -> JoinHandle<()> {
        let hook = self.clone();
        let mut invalidations = self.cache.subscribe();

        tokio::spawn(async move {
            loop {
                match invalidations.recv().await {
                    Ok(key) if key == hook.key => {
                        hook.load().await;
                    },
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(key = %hook.key, skipped, "Invalidations lagged, reloading");
                        hook.load().await;
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
