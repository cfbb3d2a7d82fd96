/// Task service: owner-scoped task operations
///
/// Every method takes an [`AuthContext`] and passes its account id to the
/// store together with the task id, so one account can never see or touch
/// another account's tasks. A foreign task and a missing task both come back
/// as [`TaskError::NotFound`].
///
/// Task ids arriving as strings are checked against the `task_<uuid>` shape
/// before any store call.
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::auth::gate::AuthContext;
/// use tasktrack_shared::tasks::{NewTask, TaskError, TaskService};
///
/// # async fn example(service: TaskService, auth: AuthContext) -> Result<(), TaskError> {
/// let task = service.add(&auth, NewTask::titled("buy milk")).await?;
/// let done = service.mark_done(&auth, task.id.as_str()).await?;
/// assert!(done.done);
/// # Ok(())
/// # }
/// ```

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::auth::gate::AuthContext;
use crate::error::ErrorKind;
use crate::models::task::{CreateTask, Task, TaskId, TaskIdError};
use crate::store::{StoreError, TaskStore};

/// Longest accepted title, in characters
pub const MAX_TITLE_CHARS: usize = 500;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid title: {0}")]
    InvalidTitle(&'static str),

    #[error("Invalid task id: {0}")]
    InvalidId(#[from] TaskIdError),

    #[error("Task not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TaskError {
    /// Classification for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::InvalidTitle(_) | TaskError::InvalidId(_) => ErrorKind::Validation,
            TaskError::NotFound => ErrorKind::NotFound,
            TaskError::Store(e) => e.kind(),
        }
    }
}

/// Input for adding a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// Task with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

fn clean_title(title: &str) -> Result<String, TaskError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(TaskError::InvalidTitle("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(TaskError::InvalidTitle("title exceeds 500 characters"));
    }

    Ok(trimmed.to_string())
}

/// Owner-scoped task operations
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Adds a task (not done) for the authenticated account
    pub async fn add(&self, auth: &AuthContext, input: NewTask) -> Result<Task, TaskError> {
        let title = clean_title(&input.title)?;
        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let task = self
            .store
            .insert_task(CreateTask {
                id: TaskId::generate(),
                account_id: auth.account_id(),
                title,
                description,
                due_date: input.due_date,
            })
            .await?;

        debug!(task_id = %task.id, account_id = %auth.account_id(), "Task added");
        Ok(task)
    }

    /// Lists the account's tasks, newest first
    pub async fn list(&self, auth: &AuthContext) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list_tasks(auth.account_id()).await?)
    }

    /// Fetches one task
    pub async fn get(&self, auth: &AuthContext, id: &str) -> Result<Task, TaskError> {
        let id = TaskId::parse(id)?;

        self.store
            .find_task(&id, auth.account_id())
            .await?
            .ok_or(TaskError::NotFound)
    }

    /// Replaces a task's title and completion flag
    pub async fn update(
        &self,
        auth: &AuthContext,
        id: &str,
        title: &str,
        done: bool,
    ) -> Result<Task, TaskError> {
        let id = TaskId::parse(id)?;
        let title = clean_title(title)?;

        let task = self
            .store
            .update_task(&id, auth.account_id(), &title, done)
            .await?
            .ok_or(TaskError::NotFound)?;

        debug!(task_id = %task.id, done, "Task updated");
        Ok(task)
    }

    /// Marks a task done; already-done tasks stay done
    pub async fn mark_done(&self, auth: &AuthContext, id: &str) -> Result<Task, TaskError> {
        let id = TaskId::parse(id)?;

        let task = self
            .store
            .mark_task_done(&id, auth.account_id())
            .await?
            .ok_or(TaskError::NotFound)?;

        debug!(task_id = %task.id, "Task marked done");
        Ok(task)
    }

    /// Deletes a task
    pub async fn delete(&self, auth: &AuthContext, id: &str) -> Result<(), TaskError> {
        let id = TaskId::parse(id)?;

        if !self.store.delete_task(&id, auth.account_id()).await? {
            return Err(TaskError::NotFound);
        }

        debug!(task_id = %id, "Task deleted");
        Ok(())
    }
}
