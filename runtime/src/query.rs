//! Key-addressed query cache.
//!
//! Entries are addressed by `(entity, scope)`. Invalidating a key marks its
//! entry stale, bumps the entry's generation and notifies subscribers; the
//! next [`QueryCache::fetch_with`] for that key runs the fetcher again.
//!
//! A fetch that started before an invalidation still stores its result when
//! it finishes, but the entry stays stale, so the following read is issued
//! again.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use todolist_core::DomainError;
use tokio::sync::broadcast;

/// Cache address: an entity name plus a scope such as an owner id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    entity: String,
    scope: String,
}

impl QueryKey {
    /// Key for `entity` restricted to `scope`.
    #[must_use]
    pub fn new(entity: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            scope: scope.into(),
        }
    }

    /// Entity part of the key.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Scope part of the key.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.scope)
    }
}

/// Reactive read state exposed by the hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successfully read items.
    pub items: Vec<T>,
    /// `true` until the first read finishes.
    pub is_loading: bool,
    /// Error of the last read, cleared by the next successful one.
    pub error: Option<DomainError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: true,
            error: None,
        }
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: Option<V>,
    stale: bool,
    generation: u64,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            stale: true,
            generation: 0,
        }
    }
}

struct Inner<V> {
    entries: Mutex<HashMap<QueryKey, Entry<V>>>,
    invalidations: broadcast::Sender<QueryKey>,
}

/// Shared cache of query results.
///
/// Cloning is cheap; clones share entries and subscribers.
///
/// # Example
///
/// ```ignore
/// let cache = QueryCache::new();
/// let key = QueryKey::new("todos", "user1");
///
/// let todos = cache.fetch_with(key.clone(), || service.find_by_owner(&owner)).await?;
/// cache.invalidate(&key);
/// ```
pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("subscribers", &self.inner.invalidations.receiver_count())
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> QueryCache<V> {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                invalidations,
            }),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, Entry<V>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, fresh or stale.
    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<V> {
        self.entries().get(key).and_then(|entry| entry.value.clone())
    }

    /// Whether the next read of `key` runs its fetcher.
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_none_or(|entry| entry.stale)
    }

    /// Number of invalidations `key` has seen.
    #[must_use]
    pub fn generation(&self, key: &QueryKey) -> u64 {
        self.entries().get(key).map_or(0, |entry| entry.generation)
    }

    /// Return the fresh value for `key`, or run `fetcher` and store its result.
    ///
    /// Failures are returned as-is and leave the entry untouched.
    ///
    /// # Errors
    ///
    /// Whatever `fetcher` returns.
    pub async fn fetch_with<F, Fut, E>(&self, key: QueryKey, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let started_at = {
            let entries = self.entries();
            match entries.get(&key) {
                Some(Entry {
                    value: Some(value),
                    stale: false,
                    ..
                }) => {
                    tracing::trace!(key = %key, "Query cache hit");
                    return Ok(value.clone());
                },
                Some(entry) => entry.generation,
                None => 0,
            }
        };

        tracing::trace!(key = %key, "Query cache miss, fetching");
        metrics::counter!("query_cache.fetches").increment(1);
        let value = fetcher().await?;

        let mut entries = self.entries();
        let entry = entries.entry(key).or_default();
        entry.value = Some(value.clone());
        entry.stale = entry.generation != started_at;
        Ok(value)
    }

    /// Mark `key` stale and notify subscribers.
    pub fn invalidate(&self, key: &QueryKey) {
        {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.stale = true;
            entry.generation += 1;
        }

        tracing::debug!(key = %key, "Query invalidated");
        metrics::counter!("query_cache.invalidations").increment(1);
        // No subscribers is fine.
        let _ = self.inner.invalidations.send(key.clone());
    }

    /// Receive every key invalidated from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.invalidations.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &AtomicUsize,
        value: u32,
    ) -> impl Future<Output = Result<u32, ()>> + '_ {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    #[tokio::test]
    async fn fresh_entries_short_circuit_the_fetcher() {
        let cache = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.fetch_with(key.clone(), || counting_fetch(&calls, 1)).await, Ok(1));
        assert_eq!(cache.fetch_with(key.clone(), || counting_fetch(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch_and_notifies() {
        let cache = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let mut invalidated = cache.subscribe();

        cache.fetch_with(key.clone(), || async { Ok::<_, ()>(1) }).await.unwrap();
        cache.invalidate(&key);

        assert_eq!(invalidated.recv().await.unwrap(), key);
        assert!(cache.is_stale(&key));
        assert_eq!(cache.get(&key), Some(1));
        assert_eq!(cache.generation(&key), 1);

        let value = cache.fetch_with(key.clone(), || async { Ok::<_, ()>(2) }).await;
        assert_eq!(value, Ok(2));
        assert!(!cache.is_stale(&key));
    }

    #[tokio::test]
    async fn failures_leave_the_entry_untouched() {
        let cache = QueryCache::new();
        let key = QueryKey::new("todos", "user1");

        cache.fetch_with(key.clone(), || async { Ok::<_, &str>(1) }).await.unwrap();
        cache.invalidate(&key);
        let err = cache.fetch_with(key.clone(), || async { Err::<u32, _>("down") }).await;

        assert_eq!(err, Err("down"));
        assert_eq!(cache.get(&key), Some(1));
        assert!(cache.is_stale(&key));
    }

    #[tokio::test]
    async fn invalidation_during_a_fetch_keeps_the_entry_stale() {
        let cache = QueryCache::new();
        let key = QueryKey::new("todos", "user1");

        let racing = cache.clone();
        let racing_key = key.clone();
        let value = cache
            .fetch_with(key.clone(), || async move {
                racing.invalidate(&racing_key);
                Ok::<_, ()>(1)
            })
            .await;

        assert_eq!(value, Ok(1));
        assert_eq!(cache.get(&key), Some(1));
        assert!(cache.is_stale(&key));
    }

    #[test]
    fn keys_are_scoped() {
        let cache: QueryCache<u32> = QueryCache::new();
        let user1 = QueryKey::new("todos", "user1");
        let user2 = QueryKey::new("todos", "user2");

        cache.invalidate(&user1);

        assert_eq!(cache.generation(&user1), 1);
        assert_eq!(cache.generation(&user2), 0);
        assert_eq!(user1.to_string(), "todos/user1");
    }

    #[test]
    fn query_state_starts_loading() {
        let state: QueryState<u32> = QueryState::default();
        assert!(state.is_loading);
        assert!(state.items.is_empty());
        assert!(state.error.is_none());
    }
}
