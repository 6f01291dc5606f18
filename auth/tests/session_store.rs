//! Session store persistence and rehydration.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use todolist_auth::mocks::{InMemorySessionStorage, MockAuthProvider};
use todolist_auth::stores::FileSessionStorage;
use todolist_auth::{
    AuthProvider, Credentials, PersistedSession, SESSION_STORAGE_NAME, SessionAction,
    SessionEnvironment, SessionState, SessionStorage, SessionTrackingProvider, User,
    open_session_store,
};

fn ada() -> User {
    User::new("u1", "ada@example.com")
}

/// Storage whose first save stalls, so later saves can finish first.
#[derive(Clone, Default)]
struct SlowFirstSave {
    inner: InMemorySessionStorage,
    stalled: Arc<AtomicBool>,
}

impl SessionStorage for SlowFirstSave {
    async fn load(&self, name: &str) -> todolist_auth::Result<Option<PersistedSession>> {
        self.inner.load(name).await
    }

    async fn save(&self, name: &str, session: &PersistedSession) -> todolist_auth::Result<()> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.inner.save(name, session).await
    }
}

#[tokio::test]
async fn every_action_persists_the_resulting_state() {
    let storage = InMemorySessionStorage::new();
    let session = open_session_store(SessionEnvironment::new(storage.clone())).await;

    session
        .send(SessionAction::SetUser { user: Some(ada()) })
        .await
        .unwrap()
        .wait()
        .await;
    session
        .send(SessionAction::SetAuthenticated { status: true })
        .await
        .unwrap()
        .wait()
        .await;

    let expected = SessionState {
        is_authenticated: true,
        user: Some(ada()),
    };
    assert_eq!(session.state(SessionState::clone).await, expected);
    assert_eq!(
        storage.document(SESSION_STORAGE_NAME),
        Some(PersistedSession::current(expected))
    );
    assert_eq!(storage.save_count(), 2);

    session.send(SessionAction::Logout).await.unwrap().wait().await;
    assert_eq!(
        storage.document(SESSION_STORAGE_NAME).unwrap().state,
        SessionState::default()
    );
}

#[tokio::test]
async fn a_slow_save_never_overwrites_a_newer_state() {
    let storage = SlowFirstSave::default();
    let session = open_session_store(SessionEnvironment::new(storage.clone())).await;

    session
        .send(SessionAction::SetAuthenticated { status: true })
        .await
        .unwrap();
    session.send(SessionAction::Logout).await.unwrap();
    session.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(session.state(SessionState::clone).await, SessionState::default());
    assert_eq!(
        storage.inner.document(SESSION_STORAGE_NAME).unwrap().state,
        SessionState::default()
    );

    let reopened = open_session_store(SessionEnvironment::new(storage.inner.clone())).await;
    assert!(!reopened.state(|s| s.is_authenticated).await);
}

#[tokio::test]
async fn reopening_rehydrates_the_persisted_state() {
    let stored = SessionState {
        is_authenticated: true,
        user: Some(ada()),
    };
    let storage = InMemorySessionStorage::new()
        .with_document(SESSION_STORAGE_NAME, PersistedSession::current(stored.clone()));

    let session = open_session_store(SessionEnvironment::new(storage)).await;

    assert_eq!(session.state(SessionState::clone).await, stored);
}

#[tokio::test]
async fn unknown_versions_and_failed_loads_start_signed_out() {
    let storage = InMemorySessionStorage::new().with_document(
        SESSION_STORAGE_NAME,
        PersistedSession {
            state: SessionState {
                is_authenticated: true,
                user: None,
            },
            version: 7,
        },
    );
    let session = open_session_store(SessionEnvironment::new(storage)).await;
    assert_eq!(session.state(SessionState::clone).await, SessionState::default());

    let broken = InMemorySessionStorage::new();
    broken.fail(true);
    let session = open_session_store(SessionEnvironment::new(broken)).await;
    assert_eq!(session.state(SessionState::clone).await, SessionState::default());
}

#[tokio::test]
async fn failed_saves_keep_the_in_memory_state() {
    let storage = InMemorySessionStorage::new();
    let session = open_session_store(SessionEnvironment::new(storage.clone())).await;
    storage.fail(true);

    session
        .send(SessionAction::SetAuthenticated { status: true })
        .await
        .unwrap()
        .wait()
        .await;

    assert!(session.state(|s| s.is_authenticated).await);
    assert_eq!(storage.save_count(), 0);
}

#[tokio::test]
async fn custom_names_are_isolated() {
    let storage = InMemorySessionStorage::new();
    let session =
        open_session_store(SessionEnvironment::new(storage.clone()).with_name("other")).await;

    session
        .send(SessionAction::SetAuthenticated { status: true })
        .await
        .unwrap()
        .wait()
        .await;

    assert!(storage.document("other").is_some());
    assert!(storage.document(SESSION_STORAGE_NAME).is_none());
}

#[tokio::test]
async fn file_storage_survives_a_restart() {
    let dir = std::env::temp_dir().join(format!("todolist-session-{}", uuid::Uuid::new_v4()));

    {
        let session =
            open_session_store(SessionEnvironment::new(FileSessionStorage::new(&dir))).await;
        session
            .send(SessionAction::SetUser { user: Some(ada()) })
            .await
            .unwrap()
            .wait_with_timeout(Duration::from_secs(5))
            .await
            .unwrap();
    }

    let storage = FileSessionStorage::new(&dir);
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(storage.path_for(SESSION_STORAGE_NAME)).unwrap())
            .unwrap();
    assert_eq!(raw["version"], 0);
    assert_eq!(raw["state"]["isAuthenticated"], false);
    assert_eq!(raw["state"]["user"]["id"], "u1");

    let reopened = open_session_store(SessionEnvironment::new(storage.clone())).await;
    assert_eq!(reopened.state(|s| s.user.clone()).await, Some(ada()));
    assert!(storage.load(SESSION_STORAGE_NAME).await.unwrap().is_some());

    tokio::fs::remove_dir_all(dir).await.unwrap();
}

#[tokio::test]
async fn tracking_provider_mirrors_sign_in_and_sign_out() {
    let storage = InMemorySessionStorage::new();
    let session = Arc::new(open_session_store(SessionEnvironment::new(storage.clone())).await);
    let auth = SessionTrackingProvider::new(
        MockAuthProvider::new().with_account("ada@example.com", "secret"),
        Arc::clone(&session),
    );

    auth.sign_in_with_password(&Credentials::new("ada@example.com", "secret"))
        .await
        .unwrap();

    let state = session.state(SessionState::clone).await;
    assert!(state.is_authenticated);
    assert_eq!(
        state.user.as_ref().and_then(|u| u.email.as_deref()),
        Some("ada@example.com")
    );
    assert_eq!(
        storage.document(SESSION_STORAGE_NAME).unwrap().state,
        state
    );

    auth.sign_out().await.unwrap();

    assert_eq!(session.state(SessionState::clone).await, SessionState::default());
    assert_eq!(
        storage.document(SESSION_STORAGE_NAME).unwrap().state,
        SessionState::default()
    );
}

#[tokio::test]
async fn tracking_provider_leaves_the_session_alone_on_rejection() {
    let storage = InMemorySessionStorage::new();
    let session = Arc::new(open_session_store(SessionEnvironment::new(storage.clone())).await);
    let auth = SessionTrackingProvider::new(MockAuthProvider::new(), Arc::clone(&session));

    let error = auth
        .sign_in_with_password(&Credentials::new("nobody@example.com", "nope"))
        .await
        .unwrap_err();

    assert!(error.is_rejection());
    assert_eq!(session.state(SessionState::clone).await, SessionState::default());
    assert_eq!(storage.save_count(), 0);
}
