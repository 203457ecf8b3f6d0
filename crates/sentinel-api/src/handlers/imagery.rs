use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use sentinel_core::models::{ImageListing, LayerTile, Polygon};

use crate::dto::{
    AnalysisDataRequest, AnalysisDataResponse, DemRequest, DemResponse, ImageRequest,
    TILE_WINDOW_DAYS, YEAR_WINDOW_DAYS, INDEX_SOURCES,
};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<ImageListing>, ApiError> {
    let query = request.to_query(Utc::now().date_naive(), YEAR_WINDOW_DAYS)?;

    tracing::info!(
        layer = %query.layer,
        dates = %query.dates,
        cloud = query.cloud_percentage,
        "Listing images"
    );

    let listing = state.earth()?.list_images(&query).await?;
    Ok(Json(listing))
}

pub async fn get_tile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<LayerTile>, ApiError> {
    let query = request.to_query(Utc::now().date_naive(), TILE_WINDOW_DAYS)?;

    tracing::info!(
        layer = %query.layer,
        dates = %query.dates,
        specific_date = ?query.specific_date,
        "Rendering tile"
    );

    let tile = state.earth()?.layer_tile(&query).await?;
    Ok(Json(tile))
}

pub async fn get_analysis_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisDataRequest>,
) -> Result<Json<AnalysisDataResponse>, ApiError> {
    let (polygon, dates) = request.parse()?;
    tracing::info!(points = polygon.len(), dates = %dates, "Computing index statistics");

    let stats = state.earth()?.index_stats(&polygon, &dates).await?;

    Ok(Json(AnalysisDataResponse {
        stats,
        period: (&dates).into(),
        satellite_source: INDEX_SOURCES,
    }))
}

pub async fn get_dem(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DemRequest>,
) -> Result<Json<DemResponse>, ApiError> {
    let polygon = Polygon::from_vertices(&request.polygon)?;
    let dem = state.earth()?.elevation(&polygon).await?;

    Ok(Json(DemResponse {
        tile_url: dem.tile_url,
        min_elevation: dem.min_elevation,
        max_elevation: dem.max_elevation,
    }))
}
