/// Storage contracts used by the core
///
/// The session manager, ownership gate and task service never issue queries
/// themselves. They talk to three narrow traits:
///
/// - [`AccountStore`]: lookup-by-email and insert
/// - [`SessionStore`]: create, fetch-by-account, fetch-by-token, refresh, delete
/// - [`TaskStore`]: owner-scoped task CRUD
///
/// Two backends implement all three:
///
/// - [`postgres::PgStore`]: sqlx over a `PgPool`, bound parameters only
/// - [`memory::MemoryStore`]: process-local tables with the same uniqueness
///   constraints, for tests and database-less runs
///
/// # Uniqueness
///
/// Backends must reject, with [`StoreError::UniqueViolation`], a second account
/// with the same email, a second session for the same account, and a duplicate
/// session token. The session manager relies on this instead of locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::models::{
    account::{Account, CreateAccount},
    session::{NewSession, Session},
    task::{CreateTask, Task, TaskId},
};

pub mod memory;
pub mod postgres;

/// Unique constraint on `accounts.email`
pub const ACCOUNTS_EMAIL_KEY: &str = "accounts_email_key";

/// Unique constraint on `sessions.account_id`
pub const SESSIONS_ACCOUNT_ID_KEY: &str = "sessions_account_id_key";

/// Unique constraint on `sessions.token`
pub const SESSIONS_TOKEN_KEY: &str = "sessions_token_key";

/// Primary key of `tasks`
pub const TASKS_PKEY: &str = "tasks_pkey";

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write lost against a unique constraint
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Whether this error is a unique violation on `constraint`
    pub fn is_unique_violation_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
    }

    /// Classification for the transport layer
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation { constraint };
            }
        }

        StoreError::Database(err)
    }
}

/// Identity store
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account by normalized email
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Inserts an account, rejecting duplicate emails
    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account>;
}

/// Session store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session, rejecting a second session for the same account
    async fn insert_session(&self, data: NewSession) -> StoreResult<Session>;

    /// Finds the session owned by `account_id`
    async fn find_session_by_account(&self, account_id: Uuid) -> StoreResult<Option<Session>>;

    /// Finds the session currently holding `token`
    async fn find_session_by_token(&self, token: Uuid) -> StoreResult<Option<Session>>;

    /// Swaps in a new token and expiry if the row still holds `previous_token`
    ///
    /// Returns `None` when the row was refreshed or removed by someone else.
    async fn refresh_session(
        &self,
        id: Uuid,
        previous_token: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<Session>>;

    /// Deletes the row if it still holds `token`; true if a row was removed
    async fn delete_session(&self, id: Uuid, token: Uuid) -> StoreResult<bool>;
}

/// Task store
///
/// Every method touching an existing row takes the owner id and must filter on
/// it together with the task id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// Owner's tasks, newest first
    async fn list_tasks(&self, account_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>>;

    async fn update_task(
        &self,
        id: &TaskId,
        account_id: Uuid,
        title: &str,
        done: bool,
    ) -> StoreResult<Option<Task>>;

    async fn mark_task_done(&self, id: &TaskId, account_id: Uuid) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: &TaskId, account_id: Uuid) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_matching() {
        let err = StoreError::UniqueViolation {
            constraint: ACCOUNTS_EMAIL_KEY.to_string(),
        };

        assert!(err.is_unique_violation_on(ACCOUNTS_EMAIL_KEY));
        assert!(!err.is_unique_violation_on(SESSIONS_ACCOUNT_ID_KEY));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains(ACCOUNTS_EMAIL_KEY));
    }

    #[test]
    fn test_from_sqlx_non_database_error() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
