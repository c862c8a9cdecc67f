//! Task endpoints
//!
//! ```text
//! GET    /v1/tasks?startDate&endDate&projectId   list (due date ascending, undated last)
//! POST   /v1/tasks                               create, 201
//! GET    /v1/tasks/:id                           fetch one
//! PUT    /v1/tasks                               partial update, body {id, ...fields}
//! DELETE /v1/tasks?id=                           delete, 204
//! ```

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTaskInput, ListTasksQuery, Task, UpdateTaskInput},
};
use uuid::Uuid;

use super::IdQuery;
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};

/// Body of `PUT /v1/tasks`
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: Uuid,

    #[serde(flatten)]
    pub changes: UpdateTaskInput,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.access(&auth).list_tasks(&query).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.access(&auth).get_task(id).await?;
    Ok(Json(task))
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(input): ApiJson<CreateTaskInput>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.access(&auth).create_task(input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = state.access(&auth).update_task(req.id, req.changes).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(IdQuery { id }): ApiQuery<IdQuery>,
) -> ApiResult<StatusCode> {
    state.access(&auth).delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
