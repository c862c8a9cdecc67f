//! Project endpoints
//!
//! ```text
//! GET    /v1/projects?includeTasks   list (creation order), optionally with tasks
//! POST   /v1/projects                create, 201
//! GET    /v1/projects/:id            detail, always with tasks
//! PUT    /v1/projects                partial update, body {id, ...fields}
//! DELETE /v1/projects?id=            delete and detach tasks, 204
//! ```

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::project::{CreateProjectInput, Project, ProjectWithTasks, UpdateProjectInput},
};
use uuid::Uuid;

use super::IdQuery;
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub include_tasks: bool,
}

/// Listing shape depends on `includeTasks`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProjectListing {
    Plain(Vec<Project>),
    WithTasks(Vec<ProjectWithTasks>),
}

/// Body of `PUT /v1/projects`
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub id: Uuid,

    #[serde(flatten)]
    pub changes: UpdateProjectInput,
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ListProjectsQuery>,
) -> ApiResult<Json<ProjectListing>> {
    let access = state.access(&auth);

    let listing = if query.include_tasks {
        ProjectListing::WithTasks(access.list_projects_with_tasks().await?)
    } else {
        ProjectListing::Plain(access.list_projects().await?)
    };

    Ok(Json(listing))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectWithTasks>> {
    let project = state.access(&auth).get_project_with_tasks(id).await?;
    Ok(Json(project))
}

pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(input): ApiJson<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.access(&auth).create_project(input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let project = state
        .access(&auth)
        .update_project(req.id, req.changes)
        .await?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(IdQuery { id }): ApiQuery<IdQuery>,
) -> ApiResult<StatusCode> {
    state.access(&auth).delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
