//! Store runtime: owns reducer state and runs the effects it returns.
//!
//! `send` reduces under a write lock and spawns each [`Effect::Future`] on
//! its own task. An action an effect resolves to is sent back into the
//! store. Every `send` returns an [`EffectHandle`] over the effects it
//! started; [`Store::shutdown`] stops new actions and waits for all of them.

use crate::error::StoreRuntimeError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use todolist_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};
use tokio::time::error::Elapsed;

/// Count of running effects; wakes watchers when it drops to zero.
#[derive(Clone)]
struct Running {
    count: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl Running {
    fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(watch::Sender::new(())),
        }
    }

    fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Exit {
        self.count.fetch_add(1, Ordering::SeqCst);
        Exit(self.clone())
    }

    async fn until_idle(&self, idle: &mut watch::Receiver<()>) {
        while self.get() > 0 {
            if idle.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Leaves [`Running`] on drop, also when the effect panics.
struct Exit(Running);

impl Drop for Exit {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.send_replace(());
        }
    }
}

/// Effects started by one [`Store::send`].
///
/// Actions fed back by those effects are tracked by their own sends, not
/// by this handle.
///
/// ```ignore
/// let mut handle = store.send(SessionAction::Logout).await?;
/// handle.wait().await;
/// ```
pub struct EffectHandle {
    running: Running,
    idle: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> Self {
        let running = Running::new();
        let idle = running.idle.subscribe();
        Self { running, idle }
    }

    /// Wait until every tracked effect has finished.
    pub async fn wait(&mut self) {
        self.running.until_idle(&mut self.idle).await;
    }

    /// [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`Elapsed`] when effects are still running at the deadline.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), Elapsed> {
        tokio::time::timeout(timeout, self.wait()).await
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("running", &self.running.get())
            .finish_non_exhaustive()
    }
}

/// Reducer state plus the environment its effects run against.
///
/// Clones share state, the shutdown flag and the running-effect count.
///
/// ```ignore
/// let store = Store::new(SessionState::default(), SessionReducer::new(), environment);
///
/// store.send(SessionAction::SetAuthenticated { status: true }).await?;
/// let signed_in = store.state(|s| s.is_authenticated).await;
/// ```
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    closed: Arc<AtomicBool>,
    running: Running,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Store starting at `initial_state`.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            closed: Arc::new(AtomicBool::new(false)),
            running: Running::new(),
        }
    }

    /// Reduce `action`, then start the effects it returns.
    ///
    /// Returns once the effects are started, not finished.
    ///
    /// # Errors
    ///
    /// [`StoreRuntimeError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreRuntimeError>
    where
        R: Clone,
        E: Clone,
    {
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreRuntimeError::ShutdownInProgress);
        }
        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };
        tracing::trace!(effects = effects.len(), "Reduced");

        let handle = EffectHandle::new();
        for effect in effects {
            self.start(effect, &handle.running);
        }
        Ok(handle)
    }

    /// Read the state through `f`.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&*self.state.read().await)
    }

    /// Stop accepting actions and wait for running effects.
    ///
    /// # Errors
    ///
    /// [`StoreRuntimeError::ShutdownTimeout`] with the number of effects
    /// still running at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreRuntimeError> {
        self.closed.store(true, Ordering::Release);
        let mut idle = self.running.idle.subscribe();

        if tokio::time::timeout(timeout, self.running.until_idle(&mut idle))
            .await
            .is_ok()
        {
            tracing::info!("Store drained");
            return Ok(());
        }

        let still_running = self.running.get();
        tracing::error!(still_running, "Store shutdown timed out");
        Err(StoreRuntimeError::ShutdownTimeout(still_running))
    }

    fn start(&self, effect: Effect<A>, handle: &Running)
    where
        R: Clone,
        E: Clone,
    {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) => {
                for effect in effects {
                    self.start(effect, handle);
                }
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.started").increment(1);
                let exits = (handle.enter(), self.running.enter());
                let store = self.clone();

                tokio::spawn(async move {
                    let _exits = exits;
                    if let Some(action) = fut.await {
                        if let Err(error) = store.send(action).await {
                            tracing::debug!(%error, "Dropped action produced by effect");
                        }
                    }
                });
            },
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            closed: Arc::clone(&self.closed),
            running: self.running.clone(),
        }
    }
}

impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .field("running", &self.running.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use todolist_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Increment,
        IncrementLater,
        IncrementTwiceLater,
        Sleep,
    }

    #[derive(Debug, Clone)]
    struct Counter;

    impl Reducer for Counter {
        type State = i32;
        type Action = Step;
        type Environment = ();

        fn reduce(&self, state: &mut i32, action: Step, _env: &()) -> SmallVec<[Effect<Step>; 4]> {
            match action {
                Step::Increment => {
                    *state += 1;
                    smallvec![Effect::None]
                },
                Step::IncrementLater => {
                    smallvec![Effect::Future(Box::pin(async { Some(Step::Increment) }))]
                },
                Step::IncrementTwiceLater => smallvec![Effect::merge(vec![
                    Effect::Future(Box::pin(async { Some(Step::Increment) })),
                    Effect::Future(Box::pin(async { Some(Step::Increment) })),
                ])],
                Step::Sleep => smallvec![Effect::fire_and_forget(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                })],
            }
        }
    }

    fn store() -> Store<i32, Step, (), Counter> {
        Store::new(0, Counter, ())
    }

    #[tokio::test]
    async fn send_reduces_in_place() {
        let store = store();
        store.send(Step::Increment).await.unwrap();
        assert_eq!(store.state(|n| *n).await, 1);
    }

    #[tokio::test]
    async fn effect_actions_are_fed_back() {
        let store = store();

        store.send(Step::IncrementLater).await.unwrap().wait().await;
        store.send(Step::IncrementTwiceLater).await.unwrap().wait().await;

        assert_eq!(store.state(|n| *n).await, 3);
    }

    #[tokio::test]
    async fn handles_wait_for_their_effects() {
        let store = store();
        let mut handle = store.send(Step::Sleep).await.unwrap();

        assert!(handle.wait_with_timeout(Duration::from_millis(1)).await.is_err());
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_drains_then_rejects() {
        let store = store();
        store.send(Step::Sleep).await.unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let rejected = store.send(Step::Increment).await;
        assert!(matches!(rejected, Err(StoreRuntimeError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn shutdown_reports_effects_still_running() {
        let store = store();
        store.send(Step::Sleep).await.unwrap();

        let result = store.shutdown(Duration::from_millis(1)).await;
        assert!(matches!(result, Err(StoreRuntimeError::ShutdownTimeout(1))));
    }
}
