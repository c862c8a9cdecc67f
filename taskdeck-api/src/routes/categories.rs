//! Category endpoints
//!
//! ```text
//! GET    /v1/categories        list (creation order)
//! POST   /v1/categories        create, 201
//! DELETE /v1/categories?id=    delete and detach from tasks, 204
//! ```
//!
//! Tasks reference categories through their `categoryIds` field.

use axum::{extract::State, http::StatusCode, Json};
use taskdeck_shared::{
    auth::middleware::AuthContext,
    models::category::{Category, CreateCategoryInput},
};

use super::IdQuery;
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiQuery},
};

pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.access(&auth).list_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.access(&auth).create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(IdQuery { id }): ApiQuery<IdQuery>,
) -> ApiResult<StatusCode> {
    state.access(&auth).delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
