//! Session persistence trait.

use crate::error::Result;
use crate::state::PersistedSession;

/// Key-value storage for persisted session documents.
pub trait SessionStorage: Send + Sync {
    /// Read the document stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the
    /// document exists but cannot be read or decoded.
    fn load(&self, name: &str) -> impl Future<Output = Result<Option<PersistedSession>>> + Send;

    /// Replace the document stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the write
    /// fails.
    fn save(&self, name: &str, session: &PersistedSession)
    -> impl Future<Output = Result<()>> + Send;
}
