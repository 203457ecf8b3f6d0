use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use sentinel_core::models::Polygon;
use sentinel_geo::LoadedDataset;
use serde_json::Value;

use crate::dto::{GeoJsonListResponse, LoadQuery, RenderLayerRequest};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_geojson(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeoJsonListResponse>, ApiError> {
    let files = state.catalog.list()?;
    Ok(Json(GeoJsonListResponse { files }))
}

pub async fn load_geojson(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoadQuery>,
) -> Result<Json<LoadedDataset>, ApiError> {
    tracing::info!(name = %query.name, "Loading GeoJSON");
    let dataset = state.catalog.load(&query.name)?;
    Ok(Json(dataset))
}

/// Features of one file, optionally limited to those near an area
pub async fn render_layer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenderLayerRequest>,
) -> Result<Json<Value>, ApiError> {
    let area = request.polygon.as_deref().map(Polygon::from_vertices).transpose()?;

    tracing::info!(
        filename = %request.filename,
        filtered = area.is_some(),
        "Rendering GeoJSON layer"
    );

    let collection = state.catalog.render_layer(&request.filename, area.as_ref())?;
    Ok(Json(collection))
}
