use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::dto::{AreaRiskRequest, AreaRiskResponse};
use crate::error::ApiError;
use crate::services::RiskService;
use crate::state::AppState;

pub async fn analyze_area(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AreaRiskRequest>,
) -> Result<Json<AreaRiskResponse>, ApiError> {
    tracing::info!(
        points = request.polygon.len(),
        area_km2 = ?request.area_km2,
        "Processing area risk request"
    );

    let response = RiskService::analyze(&state, &request, Utc::now().date_naive()).await?;
    Ok(Json(response))
}
