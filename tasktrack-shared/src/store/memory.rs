/// In-memory storage backend
///
/// Keeps accounts, sessions and tasks in process-local tables behind a single
/// `tokio::sync::RwLock`. Each trait method takes the lock once, so every
/// operation is atomic with respect to the others, and the same uniqueness
/// constraints as the PostgreSQL schema are enforced:
///
/// - `accounts.email` unique
/// - `sessions.account_id` unique
/// - `sessions.token` unique
///
/// Data is lost when the process exits. Use it for tests and local runs.
///
/// # Example
///
/// ```
/// use tasktrack_shared::store::memory::MemoryStore;
/// use tasktrack_shared::store::AccountStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// assert!(store.find_account_by_email("nobody@example.com").await?.is_none());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountStore, SessionStore, StoreError, StoreResult, TaskStore, ACCOUNTS_EMAIL_KEY,
    SESSIONS_ACCOUNT_ID_KEY, SESSIONS_TOKEN_KEY, TASKS_PKEY,
};
use crate::models::{
    account::{Account, CreateAccount},
    session::{NewSession, Session},
    task::{CreateTask, Task, TaskId},
};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<Uuid, Session>,
    tasks: HashMap<TaskId, Task>,
}

/// Process-local store implementing every storage trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts
    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }

    /// Number of session rows owned by `account_id`
    pub async fn session_count(&self, account_id: Uuid) -> usize {
        self.tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.account_id == account_id)
            .count()
    }

    /// Overwrites the expiry of the session owned by `account_id`
    ///
    /// Lets tests and fixtures age a session without waiting. Returns false if
    /// the account has no session.
    pub async fn set_session_expiry(&self, account_id: Uuid, expires_at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        match tables
            .sessions
            .values_mut()
            .find(|s| s.account_id == account_id)
        {
            Some(session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;

        if tables.accounts.values().any(|a| a.email == data.email) {
            return Err(unique_violation(ACCOUNTS_EMAIL_KEY));
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: Utc::now(),
        };
        tables.accounts.insert(account.id, account.clone());

        Ok(account)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, data: NewSession) -> StoreResult<Session> {
        let mut tables = self.tables.write().await;

        if tables.sessions.values().any(|s| s.account_id == data.account_id) {
            return Err(unique_violation(SESSIONS_ACCOUNT_ID_KEY));
        }
        if tables.sessions.values().any(|s| s.token == data.token) {
            return Err(unique_violation(SESSIONS_TOKEN_KEY));
        }

        let session = Session {
            id: Uuid::new_v4(),
            account_id: data.account_id,
            token: data.token,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        tables.sessions.insert(session.id, session.clone());

        Ok(session)
    }

    async fn find_session_by_account(&self, account_id: Uuid) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.account_id == account_id)
            .cloned())
    }

    async fn find_session_by_token(&self, token: Uuid) -> StoreResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.values().find(|s| s.token == token).cloned())
    }

    async fn refresh_session(
        &self,
        id: Uuid,
        previous_token: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let mut tables = self.tables.write().await;

        if tables
            .sessions
            .values()
            .any(|s| s.id != id && s.token == token)
        {
            return Err(unique_violation(SESSIONS_TOKEN_KEY));
        }

        match tables.sessions.get_mut(&id) {
            Some(session) if session.token == previous_token => {
                session.token = token;
                session.expires_at = expires_at;
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_session(&self, id: Uuid, token: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        let holds_token = tables
            .sessions
            .get(&id)
            .map(|s| s.token == token)
            .unwrap_or(false);

        if holds_token {
            tables.sessions.remove(&id);
        }

        Ok(holds_token)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;

        if tables.tasks.contains_key(&data.id) {
            return Err(unique_violation(TASKS_PKEY));
        }

        let now = Utc::now();
        let task = Task {
            id: data.id,
            account_id: data.account_id,
            title: data.title,
            description: data.description,
            done: false,
            due_date: data.due_date,
            added_at: now,
            modified_at: now,
        };
        tables.tasks.insert(task.id.clone(), task.clone());

        Ok(task)
    }

    async fn list_tasks(&self, account_id: Uuid) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;

        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.added_at.cmp(&a.added_at));

        Ok(tasks)
    }

    async fn find_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .get(id)
            .filter(|t| t.account_id == account_id)
            .cloned())
    }

    async fn update_task(
        &self,
        id: &TaskId,
        account_id: Uuid,
        title: &str,
        done: bool,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;

        match tables.tasks.get_mut(id) {
            Some(task) if task.account_id == account_id => {
                task.title = title.to_string();
                task.done = done;
                task.modified_at = Utc::now();
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_task_done(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;

        match tables.tasks.get_mut(id) {
            Some(task) if task.account_id == account_id => {
                task.done = true;
                task.modified_at = Utc::now();
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        let owned = tables
            .tasks
            .get(id)
            .map(|t| t.account_id == account_id)
            .unwrap_or(false);

        if owned {
            tables.tasks.remove(id);
        }

        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_account(email: &str) -> CreateAccount {
        CreateAccount {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_account(create_account("a@x.com")).await.unwrap();

        let err = store
            .insert_account(create_account("a@x.com"))
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on(ACCOUNTS_EMAIL_KEY));
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_one_session_per_account() {
        let store = MemoryStore::new();
        let account = store.insert_account(create_account("a@x.com")).await.unwrap();

        store
            .insert_session(NewSession::issue(account.id, Duration::minutes(15)).unwrap())
            .await
            .unwrap();
        let err = store
            .insert_session(NewSession::issue(account.id, Duration::minutes(15)).unwrap())
            .await
            .unwrap_err();

        assert!(err.is_unique_violation_on(SESSIONS_ACCOUNT_ID_KEY));
        assert_eq!(store.session_count(account.id).await, 1);
    }

    #[tokio::test]
    async fn test_refresh_is_compare_and_swap() {
        let store = MemoryStore::new();
        let account = store.insert_account(create_account("a@x.com")).await.unwrap();
        let session = store
            .insert_session(NewSession::issue(account.id, Duration::minutes(15)).unwrap())
            .await
            .unwrap();

        let expires_at = Utc::now() + Duration::minutes(30);
        let first = Uuid::new_v4();
        let refreshed = store
            .refresh_session(session.id, session.token, first, expires_at)
            .await
            .unwrap()
            .expect("first refresh wins");
        assert_eq!(refreshed.id, session.id);
        assert_eq!(refreshed.token, first);

        // Second writer still believes the old token is current
        let lost = store
            .refresh_session(session.id, session.token, Uuid::new_v4(), expires_at)
            .await
            .unwrap();
        assert!(lost.is_none());
    }

    #[tokio::test]
    async fn test_delete_requires_current_token() {
        let store = MemoryStore::new();
        let account = store.insert_account(create_account("a@x.com")).await.unwrap();
        let session = store
            .insert_session(NewSession::issue(account.id, Duration::minutes(15)).unwrap())
            .await
            .unwrap();

        assert!(!store.delete_session(session.id, Uuid::new_v4()).await.unwrap());
        assert!(store.delete_session(session.id, session.token).await.unwrap());
        assert!(!store.delete_session(session.id, session.token).await.unwrap());
        assert_eq!(store.session_count(account.id).await, 0);
    }

    #[tokio::test]
    async fn test_task_queries_are_owner_scoped() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let task = store
            .insert_task(CreateTask {
                id: TaskId::generate(),
                account_id: owner,
                title: "buy milk".to_string(),
                description: None,
                due_date: None,
            })
            .await
            .unwrap();

        assert!(store.find_task(&task.id, stranger).await.unwrap().is_none());
        assert!(store
            .update_task(&task.id, stranger, "stolen", true)
            .await
            .unwrap()
            .is_none());
        assert!(store.mark_task_done(&task.id, stranger).await.unwrap().is_none());
        assert!(!store.delete_task(&task.id, stranger).await.unwrap());
        assert!(store.list_tasks(stranger).await.unwrap().is_empty());

        let unchanged = store.find_task(&task.id, owner).await.unwrap().unwrap();
        assert_eq!(unchanged.title, "buy milk");
        assert!(!unchanged.done);
    }
}
