/// Task model and database operations
///
/// Tasks are privately owned by one account. Every query in this module that
/// touches an existing row filters on both the task id *and* the owning
/// account id; a task belonging to someone else is indistinguishable from a
/// task that does not exist.
///
/// # Identifiers
///
/// Task ids are namespaced strings: `task_` followed by a hyphenated UUID,
/// e.g. `task_67e55044-10b1-426f-9247-bb680e5fe0c8`. [`TaskId::parse`] rejects
/// anything else before it can reach a query.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id TEXT PRIMARY KEY,
///     account_id UUID NOT NULL REFERENCES accounts(id),
///     title VARCHAR(500) NOT NULL,
///     description TEXT,
///     done BOOLEAN NOT NULL DEFAULT FALSE,
///     due_date DATE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     modified_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_tasks_account_id ON tasks(account_id);
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::PgPool;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Namespace prefix carried by every task id
pub const TASK_ID_PREFIX: &str = "task_";

/// Error returned when a string is not a well-formed task id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskIdError {
    /// The `task_` namespace marker is missing
    #[error("task id must start with \"task_\"")]
    MissingPrefix,

    /// The part after the prefix is not a hyphenated UUID
    #[error("task id suffix is not a valid identifier")]
    InvalidSuffix,
}

/// Namespaced task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a new random task id
    pub fn generate() -> Self {
        Self(format!("{}{}", TASK_ID_PREFIX, Uuid::new_v4().hyphenated()))
    }

    /// Parses and validates a task id
    ///
    /// The suffix must be the canonical 36-character hyphenated UUID form, so
    /// there is exactly one string per id.
    ///
    /// # Example
    ///
    /// ```
    /// use tasktrack_shared::models::task::TaskId;
    ///
    /// assert!(TaskId::parse("task_67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    /// assert!(TaskId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").is_err());
    /// assert!(TaskId::parse("task_1' OR '1'='1").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TaskIdError> {
        let suffix = raw
            .strip_prefix(TASK_ID_PREFIX)
            .ok_or(TaskIdError::MissingPrefix)?;

        let uuid = Uuid::try_parse(suffix).map_err(|_| TaskIdError::InvalidSuffix)?;

        // Reject braced/simple/urn spellings and uppercase so ids stay canonical
        if uuid.hyphenated().to_string() != suffix {
            return Err(TaskIdError::InvalidSuffix);
        }

        Ok(Self(raw.to_string()))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = TaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaskId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Task owned by a single account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Namespaced task id
    #[sqlx(try_from = "String")]
    pub id: TaskId,

    /// Owning account
    pub account_id: Uuid,

    /// Trimmed, non-empty title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Completion flag
    pub done: bool,

    /// Optional due date
    pub due_date: Option<NaiveDate>,

    /// When the task was added
    pub added_at: DateTime<Utc>,

    /// When the task was last modified
    pub modified_at: DateTime<Utc>,
}

/// Input for inserting a task row
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub id: TaskId,
    pub account_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl Task {
    /// Inserts a task (not done)
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, account_id, title, description, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, title, description, done, due_date,
                      added_at, modified_at
            "#,
        )
        .bind(data.id.as_str())
        .bind(data.account_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Lists an account's tasks, newest first
    pub async fn list_by_account(
        pool: &PgPool,
        account_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, account_id, title, description, done, due_date,
                   added_at, modified_at
            FROM tasks
            WHERE account_id = $1
            ORDER BY added_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Finds a task by id, scoped to its owner
    pub async fn find_by_id_and_account(
        pool: &PgPool,
        id: &TaskId,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, account_id, title, description, done, due_date,
                   added_at, modified_at
            FROM tasks
            WHERE id = $1 AND account_id = $2
            "#,
        )
        .bind(id.as_str())
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Updates title and done flag, scoped to the owner
    ///
    /// Returns `None` if no row matches both id and owner.
    pub async fn update_scoped(
        pool: &PgPool,
        id: &TaskId,
        account_id: Uuid,
        title: &str,
        done: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $3,
                done = $4,
                modified_at = NOW()
            WHERE id = $1 AND account_id = $2
            RETURNING id, account_id, title, description, done, due_date,
                      added_at, modified_at
            "#,
        )
        .bind(id.as_str())
        .bind(account_id)
        .bind(title)
        .bind(done)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Marks a task done, scoped to the owner
    pub async fn mark_done_scoped(
        pool: &PgPool,
        id: &TaskId,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET done = TRUE,
                modified_at = NOW()
            WHERE id = $1 AND account_id = $2
            RETURNING id, account_id, title, description, done, due_date,
                      added_at, modified_at
            "#,
        )
        .bind(id.as_str())
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task, scoped to the owner
    ///
    /// Returns true if a row was removed.
    pub async fn delete_scoped(
        pool: &PgPool,
        id: &TaskId,
        account_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND account_id = $2")
            .bind(id.as_str())
            .bind(account_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_roundtrips_through_parse() {
        let id = TaskId::generate();
        assert!(id.as_str().starts_with(TASK_ID_PREFIX));
        assert_eq!(TaskId::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert_eq!(
            TaskId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Err(TaskIdError::MissingPrefix)
        );
        assert_eq!(TaskId::parse(""), Err(TaskIdError::MissingPrefix));
        assert_eq!(
            TaskId::parse("todo_67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Err(TaskIdError::MissingPrefix)
        );
    }

    #[test]
    fn test_parse_rejects_bad_suffix() {
        let bad = [
            "task_",
            "task_not-a-uuid",
            "task_67e55044-10b1-426f-9247-bb680e5fe0c",
            "task_67e5504410b1426f9247bb680e5fe0c8",
            "task_67E55044-10B1-426F-9247-BB680E5FE0C8",
            "task_{67e55044-10b1-426f-9247-bb680e5fe0c8}",
            "task_67e55044-10b1-426f-9247-bb680e5fe0c8; DROP TABLE tasks",
        ];

        for raw in bad {
            assert_eq!(
                TaskId::parse(raw),
                Err(TaskIdError::InvalidSuffix),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_task_id_serde() {
        let id = TaskId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<TaskId>("\"task_nope\"").is_err());
    }
}
