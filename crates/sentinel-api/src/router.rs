use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Service
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))

        // Imagery
        .route("/api/list_images", post(handlers::list_images))
        .route("/api/get_tile", post(handlers::get_tile))
        .route("/api/get_analysis_data", post(handlers::get_analysis_data))
        .route("/api/get_dem", post(handlers::get_dem))
        .route("/api/analyze_area", post(handlers::analyze_area))

        // GeoJSON datasets
        .route("/api/geojson/list", get(handlers::list_geojson))
        .route("/api/geojson/load", get(handlers::load_geojson))
        .route("/api/geojson/render_layer", post(handlers::render_layer))

        // Assistant
        .route("/api/agent/analyze", post(handlers::analyze_region))
        .route("/api/agent/chat", post(handlers::chat))
        .route("/api/agent/chat/text", post(handlers::chat_text))
        .route("/api/agent/health", get(handlers::agent_health))

        .with_state(state)
}

/// CORS for the configured origins, plus any origin ending in `suffix`
pub fn cors_layer(origins: &[String], suffix: Option<&str>) -> CorsLayer {
    let exact: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let suffix = suffix.map(str::to_string);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            exact.contains(origin) || origin_has_suffix(origin, suffix.as_deref())
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn origin_has_suffix(origin: &HeaderValue, suffix: Option<&str>) -> bool {
    match (suffix, origin.to_str()) {
        (Some(suffix), Ok(origin)) => origin.ends_with(suffix),
        _ => false,
    }
}
