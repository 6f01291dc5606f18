//! Fire-and-forget mutations.
//!
//! A mutation runs on its own task. The call site gets a [`MutationHandle`]
//! right away and never sees an error directly: failures show up in the
//! mutation's [`MutationStatus`] and in the handle's outcome.
//!
//! Overlapping calls of one kind share a status; only the most recent call
//! publishes its result, so the status stays `Pending` until the latest call
//! has finished.

use crate::query::{QueryCache, QueryKey};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use todolist_core::DomainError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Progress of the latest call of one mutation kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MutationStatus {
    /// Never called.
    #[default]
    Idle,
    /// Running.
    Pending,
    /// Finished and invalidated its query.
    Succeeded,
    /// Finished with an error.
    Failed(DomainError),
}

impl MutationStatus {
    /// Whether the mutation is still running.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Error of the last call, if it failed.
    #[must_use]
    pub const fn error(&self) -> Option<&DomainError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Result of a started mutation.
#[derive(Debug)]
pub struct MutationHandle<T> {
    task: JoinHandle<Result<T, DomainError>>,
    status: watch::Receiver<MutationStatus>,
}

impl<T> MutationHandle<T> {
    /// Wait for the mutation and return its result.
    ///
    /// # Errors
    ///
    /// The mutation's [`DomainError`], or `INTERNAL_ERROR` if its task
    /// was cancelled or panicked.
    pub async fn outcome(self) -> Result<T, DomainError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(error = %join_error, "Mutation task did not finish");
                Err(DomainError::internal(None))
            },
        }
    }

    /// Status channel of this mutation kind.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<MutationStatus> {
        self.status.clone()
    }
}

/// Status of one mutation kind plus the number of its latest call.
#[derive(Debug)]
pub(crate) struct MutationChannel {
    status: watch::Sender<MutationStatus>,
    latest: AtomicU64,
}

impl MutationChannel {
    pub(crate) fn borrow(&self) -> watch::Ref<'_, MutationStatus> {
        self.status.borrow()
    }

    fn start(&self) -> u64 {
        let call = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(MutationStatus::Pending);
        call
    }

    /// Publish `status` if `call` is still the latest call.
    fn finish(&self, call: u64, status: MutationStatus) {
        self.status.send_if_modified(|current| {
            if self.latest.load(Ordering::SeqCst) != call {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Status channel of one mutation kind, shared by the hook's clones.
pub(crate) type StatusSender = Arc<MutationChannel>;

pub(crate) fn status_channel() -> StatusSender {
    Arc::new(MutationChannel {
        status: watch::Sender::new(MutationStatus::Idle),
        latest: AtomicU64::new(0),
    })
}

/// Spawn `work`; on success invalidate `key`, then publish the status.
pub(crate) fn spawn_mutation<V, T, Fut>(
    kind: &'static str,
    status: &StatusSender,
    cache: &QueryCache<V>,
    key: &QueryKey,
    work: Fut,
) -> MutationHandle<T>
where
    V: Clone + Send + Sync + 'static,
    T: Send + 'static,
    Fut: Future<Output = Result<T, DomainError>> + Send + 'static,
{
    let call = status.start();

    let channel = Arc::clone(status);
    let cache = cache.clone();
    let key = key.clone();

    let task = tokio::spawn(async move {
        let result = work.await;
        match &result {
            Ok(_) => {
                cache.invalidate(&key);
                channel.finish(call, MutationStatus::Succeeded);
            },
            Err(error) => {
                tracing::warn!(mutation = kind, key = %key, code = %error.code(), error = %error, "Mutation failed");
                channel.finish(call, MutationStatus::Failed(error.clone()));
            },
        }
        result
    });

    MutationHandle {
        task,
        status: status.status.subscribe(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_invalidates_then_reports() {
        let cache: QueryCache<u32> = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let status = status_channel();
        let mut invalidated = cache.subscribe();

        let handle = spawn_mutation("create", &status, &cache, &key, async { Ok(7) });

        assert_eq!(handle.outcome().await, Ok(7));
        assert_eq!(invalidated.recv().await.unwrap(), key);
        assert_eq!(*status.borrow(), MutationStatus::Succeeded);
    }

    #[tokio::test]
    async fn failure_is_reported_without_invalidating() {
        let cache: QueryCache<u32> = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let status = status_channel();

        let handle = spawn_mutation::<_, u32, _>("delete", &status, &cache, &key, async {
            Err(DomainError::bad_request("permission denied"))
        });
        let watcher = handle.status();

        let err = handle.outcome().await.unwrap_err();
        assert_eq!(err.message(), "permission denied");
        assert_eq!(watcher.borrow().error(), Some(&err));
        assert_eq!(cache.generation(&key), 0);
    }

    #[tokio::test]
    async fn overlapping_calls_stay_pending_until_the_latest_finishes() {
        let cache: QueryCache<u32> = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let status = status_channel();
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let first = spawn_mutation("create", &status, &cache, &key, async { Ok(1) });
        let second = spawn_mutation("create", &status, &cache, &key, async move {
            released.await.ok();
            Ok(2)
        });

        assert_eq!(first.outcome().await, Ok(1));
        assert!(status.borrow().is_pending());

        release.send(()).unwrap();
        assert_eq!(second.outcome().await, Ok(2));
        assert_eq!(*status.borrow(), MutationStatus::Succeeded);
    }

    #[tokio::test]
    async fn superseded_failures_are_not_reported() {
        let cache: QueryCache<u32> = QueryCache::new();
        let key = QueryKey::new("todos", "user1");
        let status = status_channel();
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let first = spawn_mutation::<_, u32, _>("update", &status, &cache, &key, async move {
            released.await.ok();
            Err(DomainError::bad_request("stale write"))
        });
        let second = spawn_mutation("update", &status, &cache, &key, async { Ok(2) });

        assert_eq!(second.outcome().await, Ok(2));
        release.send(()).unwrap();
        assert!(first.outcome().await.is_err());

        assert_eq!(*status.borrow(), MutationStatus::Succeeded);
    }

    #[test]
    fn statuses_start_idle() {
        let status = status_channel();
        assert_eq!(*status.borrow(), MutationStatus::Idle);
        assert!(!status.borrow().is_pending());
    }
}
