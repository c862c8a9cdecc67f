//! Health check endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// Store backend name (`postgres` or `memory`)
    pub storage: String,

    /// `connected` or `disconnected`
    pub database: String,
}

/// Reports server version and store connectivity
///
/// Always answers 200 so that a load balancer can distinguish "process up,
/// store down" from "process down".
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.store.backend_name().to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
