/// Session manager behavior when the stores fail or lose a race
///
/// `FaultyStore` wraps the in-memory store and can be told to fail an insert
/// or delete, or to let a competing writer touch the session row right before
/// a refresh lands.
///
/// Run with: cargo test --test store_failure_tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tasktrack_shared::auth::gate::{GateConfig, OwnershipGate};
use tasktrack_shared::auth::password::{HasherConfig, PasswordHasher};
use tasktrack_shared::auth::session::{AuthError, SessionConfig, SessionManager};
use tasktrack_shared::error::ErrorKind;
use tasktrack_shared::models::account::{Account, CreateAccount};
use tasktrack_shared::models::session::{NewSession, Session};
use tasktrack_shared::store::memory::MemoryStore;
use tasktrack_shared::store::{AccountStore, SessionStore, StoreError, StoreResult};
use uuid::Uuid;

/// Writer that gets to the session row first during a refresh
#[derive(Debug, Clone, Copy)]
enum Competitor {
    Refresh,
    Logout,
}

#[derive(Default)]
struct FaultyStore {
    memory: MemoryStore,
    fail_account_insert: AtomicBool,
    fail_session_insert: AtomicBool,
    fail_session_delete: AtomicBool,
    competitor: Mutex<Option<Competitor>>,
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.memory.find_account_by_email(email).await
    }

    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account> {
        if self.fail_account_insert.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.memory.insert_account(data).await
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn insert_session(&self, data: NewSession) -> StoreResult<Session> {
        if self.fail_session_insert.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.memory.insert_session(data).await
    }

    async fn find_session_by_account(&self, account_id: Uuid) -> StoreResult<Option<Session>> {
        self.memory.find_session_by_account(account_id).await
    }

    async fn find_session_by_token(&self, token: Uuid) -> StoreResult<Option<Session>> {
        self.memory.find_session_by_token(token).await
    }

    async fn refresh_session(
        &self,
        id: Uuid,
        previous_token: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let competitor = self.competitor.lock().unwrap().take();
        match competitor {
            Some(Competitor::Refresh) => {
                self.memory
                    .refresh_session(id, previous_token, Uuid::new_v4(), expires_at)
                    .await?;
            }
            Some(Competitor::Logout) => {
                self.memory.delete_session(id, previous_token).await?;
            }
            None => {}
        }

        self.memory
            .refresh_session(id, previous_token, token, expires_at)
            .await
    }

    async fn delete_session(&self, id: Uuid, token: Uuid) -> StoreResult<bool> {
        if self.fail_session_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.memory.delete_session(id, token).await
    }
}

struct Harness {
    store: Arc<FaultyStore>,
    sessions: SessionManager,
    gate: OwnershipGate,
}

fn harness() -> Harness {
    let store = Arc::new(FaultyStore::default());
    let hasher = PasswordHasher::new(HasherConfig::insecure_fast()).expect("valid params");
    let sessions = SessionManager::new(
        store.clone(),
        store.clone(),
        hasher,
        SessionConfig::default(),
    )
    .expect("session manager");

    Harness {
        gate: OwnershipGate::new(store.clone(), GateConfig::default()),
        sessions,
        store,
    }
}

impl Harness {
    async fn register_and_expire(&self) -> Session {
        let session = self
            .sessions
            .register("Alice", "a@x.com", "longpass1")
            .await
            .expect("register");
        self.store
            .memory
            .set_session_expiry(session.account_id, Utc::now() - Duration::seconds(1))
            .await;
        session
    }
}

#[tokio::test]
async fn test_register_surfaces_account_insert_failure() {
    let h = harness();
    h.store.fail_account_insert.store(true, Ordering::SeqCst);

    let err = h
        .sessions
        .register("Alice", "a@x.com", "longpass1")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Store(StoreError::Database(_))));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(h.store.memory.account_count().await, 0);
}

#[tokio::test]
async fn test_register_surfaces_session_insert_failure() {
    let h = harness();
    h.store.fail_session_insert.store(true, Ordering::SeqCst);

    let err = h
        .sessions
        .register("Alice", "a@x.com", "longpass1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Store(StoreError::Database(_))));

    let account = h
        .store
        .memory
        .find_account_by_email("a@x.com")
        .await
        .unwrap()
        .expect("account was written before the session step");
    assert_eq!(h.store.memory.session_count(account.id).await, 0);

    // Once storage recovers, login opens the missing session
    h.store.fail_session_insert.store(false, Ordering::SeqCst);
    let session = h.sessions.login("a@x.com", "longpass1").await.unwrap();
    assert_eq!(session.account_id, account.id);
}

#[tokio::test]
async fn test_failed_logout_leaves_session_usable() {
    let h = harness();
    let session = h
        .sessions
        .register("Alice", "a@x.com", "longpass1")
        .await
        .unwrap();
    let token = session.token.to_string();
    h.store.fail_session_delete.store(true, Ordering::SeqCst);

    let err = h.sessions.logout(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Store(_)));

    let auth = h.gate.resolve(Some(&token)).await.unwrap();
    assert_eq!(auth.account_id(), session.account_id);
    assert_eq!(auth.session_id(), session.id);
    assert_eq!(h.store.memory.session_count(session.account_id).await, 1);
}

#[tokio::test]
async fn test_refresh_losing_to_concurrent_refresh_conflicts() {
    let h = harness();
    let expired = h.register_and_expire().await;
    *h.store.competitor.lock().unwrap() = Some(Competitor::Refresh);

    let err = h.sessions.login("a@x.com", "longpass1").await.unwrap_err();

    assert!(matches!(err, AuthError::SessionConflict));
    assert_eq!(err.kind(), ErrorKind::Storage);

    let current = h
        .store
        .memory
        .find_session_by_account(expired.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, expired.id);
    assert_ne!(current.token, expired.token);
}

#[tokio::test]
async fn test_refresh_racing_logout_creates_new_session() {
    let h = harness();
    let expired = h.register_and_expire().await;
    *h.store.competitor.lock().unwrap() = Some(Competitor::Logout);

    let session = h.sessions.login("a@x.com", "longpass1").await.unwrap();

    assert_ne!(session.id, expired.id);
    assert!(!session.is_expired());
    assert_eq!(h.store.memory.session_count(expired.account_id).await, 1);

    let auth = h.gate.resolve(Some(&session.token.to_string())).await.unwrap();
    assert_eq!(auth.session_id(), session.id);
}
