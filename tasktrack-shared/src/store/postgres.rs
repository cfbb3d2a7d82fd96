/// PostgreSQL storage backend
///
/// Thin adapter from the storage traits to the model queries in
/// [`crate::models`]. Unique violations are translated into
/// [`StoreError::UniqueViolation`] by the `From<sqlx::Error>` impl.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
/// use tasktrack_shared::store::postgres::PgStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = Arc::new(PgStore::new(pool));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, SessionStore, StoreResult, TaskStore};
use crate::models::{
    account::{Account, CreateAccount},
    session::{NewSession, Session},
    task::{CreateTask, Task, TaskId},
};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and migrations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_email(&self.pool, email).await?)
    }

    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account> {
        Ok(Account::create(&self.pool, data).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, data: NewSession) -> StoreResult<Session> {
        Ok(Session::create(&self.pool, data).await?)
    }

    async fn find_session_by_account(&self, account_id: Uuid) -> StoreResult<Option<Session>> {
        Ok(Session::find_by_account(&self.pool, account_id).await?)
    }

    async fn find_session_by_token(&self, token: Uuid) -> StoreResult<Option<Session>> {
        Ok(Session::find_by_token(&self.pool, token).await?)
    }

    async fn refresh_session(
        &self,
        id: Uuid,
        previous_token: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        Ok(Session::refresh(&self.pool, id, previous_token, token, expires_at).await?)
    }

    async fn delete_session(&self, id: Uuid, token: Uuid) -> StoreResult<bool> {
        Ok(Session::delete(&self.pool, id, token).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn list_tasks(&self, account_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_account(&self.pool, account_id).await?)
    }

    async fn find_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id_and_account(&self.pool, id, account_id).await?)
    }

    async fn update_task(
        &self,
        id: &TaskId,
        account_id: Uuid,
        title: &str,
        done: bool,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update_scoped(&self.pool, id, account_id, title, done).await?)
    }

    async fn mark_task_done(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::mark_done_scoped(&self.pool, id, account_id).await?)
    }

    async fn delete_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete_scoped(&self.pool, id, account_id).await?)
    }
}
