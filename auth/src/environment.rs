//! Session environment.
//!
//! Dependencies the session reducer needs to persist state.

use crate::providers::SessionStorage;
use crate::state::SESSION_STORAGE_NAME;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Orders session saves.
///
/// Each reduced state takes a ticket in reduce order. Saves run one at a
/// time, and a save whose ticket is older than the last written one is
/// dropped, so the stored document never goes back to an earlier state.
#[derive(Debug, Clone, Default)]
pub struct SaveOrder {
    issued: Arc<AtomicU64>,
    written: Arc<Mutex<u64>>,
}

impl SaveOrder {
    /// Ticket for the next save.
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Exclusive access to the last written ticket.
    pub async fn writer(&self) -> MutexGuard<'_, u64> {
        self.written.lock().await
    }
}

/// Session environment.
///
/// # Type Parameters
///
/// - `S`: Session storage
#[derive(Debug, Clone)]
pub struct SessionEnvironment<S>
where
    S: SessionStorage + Clone,
{
    /// Where session documents are written.
    pub storage: S,

    /// Document name.
    pub name: String,

    /// Save ordering shared by every clone.
    pub saves: SaveOrder,
}

impl<S> SessionEnvironment<S>
where
    S: SessionStorage + Clone,
{
    /// Environment persisting under the default document name.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            name: SESSION_STORAGE_NAME.to_string(),
            saves: SaveOrder::default(),
        }
    }

    /// Persist under `name` instead.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
