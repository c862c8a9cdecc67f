//! Dashboard statistics endpoint

use axum::{extract::State, Json};
use chrono::Utc;
use taskdeck_shared::{auth::middleware::AuthContext, models::stats::TaskStats};

use crate::{app::AppState, error::ApiResult};

/// `GET /v1/dashboard`
pub async fn stats(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<TaskStats>> {
    let stats = state.access(&auth).task_stats(Utc::now()).await?;
    Ok(Json(stats))
}
