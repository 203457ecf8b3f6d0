use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::dto::{HealthResponse, RootResponse};
use crate::state::AppState;

pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse::new(state.gee_project.clone()))
}

/// Service health; degraded when Earth Engine is unreachable or unconfigured
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let gee_ok = match state.earth() {
        Ok(earth) => match earth.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Earth Engine health check failed");
                false
            }
        },
        Err(_) => false,
    };

    Json(HealthResponse::new(gee_ok, Utc::now().to_rfc3339()))
}
