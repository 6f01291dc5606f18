//! File-backed session storage.

use crate::error::{AuthError, Result};
use crate::providers::SessionStorage;
use crate::state::PersistedSession;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each session document as `<dir>/<name>.json`.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    /// Storage rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document called `name`.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

fn storage_error(action: &str, path: &Path, error: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(format!("Failed to {action} {}: {error}", path.display()))
}

impl SessionStorage for FileSessionStorage {
    async fn load(&self, name: &str) -> Result<Option<PersistedSession>> {
        let path = self.path_for(name);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| storage_error("decode", &path, e))
    }

    async fn save(&self, name: &str, session: &PersistedSession) -> Result<()> {
        let path = self.path_for(name);
        let tmp = self
            .dir
            .join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()));

        let bytes = serde_json::to_vec(session).map_err(|e| storage_error("encode", &path, e))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error("create", &self.dir, e))?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage_error("write", &tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_error("replace", &path, e));
        }

        tracing::trace!(path = %path.display(), "Session document written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::{SessionState, User};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("todolist-session-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_documents_load_as_none() {
        let storage = FileSessionStorage::new(scratch_dir());
        assert_eq!(storage.load("app-storage").await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_documents_load_back() {
        let dir = scratch_dir();
        let storage = FileSessionStorage::new(&dir);
        let doc = PersistedSession::current(SessionState {
            is_authenticated: true,
            user: Some(User::new("u1", "ada@example.com")),
        });

        storage.save("app-storage", &doc).await.unwrap();

        assert!(storage.path_for("app-storage").exists());
        assert_eq!(storage.load("app-storage").await.unwrap(), Some(doc));
        let leftovers = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(leftovers, 1);

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_documents_are_storage_errors() {
        let dir = scratch_dir();
        let storage = FileSessionStorage::new(&dir);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(storage.path_for("app-storage"), b"{not json")
            .await
            .unwrap();

        let error = storage.load("app-storage").await.unwrap_err();
        assert!(matches!(error, AuthError::Storage(_)));

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }
}
