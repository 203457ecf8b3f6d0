use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::dto::{
    AgentAnalyzeRequest, AgentHealthResponse, AgentResponse, ChatRequest, ChatResponse,
};
use crate::error::ApiError;
use crate::services::{ChatService, RegionService, AGENT_NAME};
use crate::state::AppState;

pub async fn analyze_region(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AgentAnalyzeRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    tracing::info!(
        points = request.polygon_coords.len(),
        start = %request.date_range.start,
        end = %request.date_range.end,
        "Processing region analysis request"
    );

    let response = RegionService::analyze(&state, &request).await?;
    Ok(Json(response))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    tracing::info!(
        session = request.session_id.as_deref().unwrap_or("default"),
        has_context = request.context_data.is_some(),
        "Processing chat message"
    );

    let response = ChatService::chat(&state, request).await?;
    Ok(Json(response))
}

pub async fn chat_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    tracing::info!(
        session = request.session_id.as_deref().unwrap_or("default"),
        "Processing text chat message"
    );

    let response = ChatService::chat_text(&state, request).await?;
    Ok(Json(response))
}

pub async fn agent_health(State(state): State<Arc<AppState>>) -> Json<AgentHealthResponse> {
    let timestamp = Utc::now().to_rfc3339();

    let response = match state.generator() {
        Ok(generator) => AgentHealthResponse {
            status: "ok",
            agent: AGENT_NAME,
            model: Some(generator.model_name().to_string()),
            message: "Assistente de análise geoespacial".to_string(),
            timestamp,
        },
        Err(_) => AgentHealthResponse {
            status: "unavailable",
            agent: AGENT_NAME,
            model: None,
            message: "Agente não inicializado. Configure GOOGLE_API_KEY ou OPENAI_API_KEY."
                .to_string(),
            timestamp,
        },
    };

    Json(response)
}
