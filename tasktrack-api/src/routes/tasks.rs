/// Task endpoints
///
/// All routes sit behind the gate middleware; the handlers receive the
/// caller's [`AuthContext`] from request extensions and never read an account
/// id from the request itself.
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - List own tasks, newest first
/// - `POST   /v1/tasks` - Add a task
/// - `GET    /v1/tasks/:id` - Get a task
/// - `PUT    /v1/tasks/:id` - Replace title and done flag
/// - `POST   /v1/tasks/:id/done` - Mark done
/// - `DELETE /v1/tasks/:id` - Delete
///
/// Another account's task answers `404`, exactly like a missing one.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tasktrack_shared::{auth::gate::AuthContext, models::task::Task, tasks::NewTask};

/// Update request
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    pub done: bool,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list(&auth).await?))
}

/// Add a task
///
/// ```text
/// POST /v1/tasks
///
/// { "title": "buy milk", "description": "2 liters", "due_date": "2026-01-31" }
/// ```
///
/// Responds `201 Created` with the task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.tasks.add(&auth, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get(&auth, &id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .tasks
        .update(&auth, &id, &req.title, req.done)
        .await?;
    Ok(Json(task))
}

pub async fn mark_task_done(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.mark_done(&auth, &id).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.tasks.delete(&auth, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
