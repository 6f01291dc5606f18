//! In-memory session storage.

use crate::error::{AuthError, Result};
use crate::providers::SessionStorage;
use crate::state::PersistedSession;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Session storage kept in a shared map.
///
/// Clones share documents, the save counter and the failure switch.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    documents: Arc<Mutex<HashMap<String, PersistedSession>>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl InMemorySessionStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage already holding `document` under `name`.
    #[must_use]
    pub fn with_document(self, name: &str, document: PersistedSession) -> Self {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(name.to_string(), document);
        }
        self
    }

    /// Document stored under `name`.
    #[must_use]
    pub fn document(&self, name: &str) -> Option<PersistedSession> {
        self.documents.lock().ok()?.get(name).cloned()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every load and save fail while `failing` is set.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Storage("storage unavailable".into()));
        }
        Ok(())
    }
}

impl SessionStorage for InMemorySessionStorage {
    async fn load(&self, name: &str) -> Result<Option<PersistedSession>> {
        self.check()?;
        let documents = self
            .documents
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))?;
        Ok(documents.get(name).cloned())
    }

    async fn save(&self, name: &str, session: &PersistedSession) -> Result<()> {
        self.check()?;
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".into()))?;
        documents.insert(name.to_string(), session.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
