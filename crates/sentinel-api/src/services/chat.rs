use futures::future::join_all;
use sentinel_core::chat::{
    chat_prompt, dialectize, dispatch, enrich_message, fallback_response, normalize_slang,
    Capability, Invocation, ToolOutcome,
};
use sentinel_core::error::{Result as CoreResult, SentinelError};
use sentinel_core::models::{ChatContext, DateRange, ImageQuery, LayerType};
use sentinel_geo::summarize_features;
use sentinel_llm::{GenerationRequest, Generator};

use crate::dto::{ChatRequest, ChatResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Reply used when the model answers with nothing
pub const EMPTY_REPLY: &str = "Desculpa, tive um problema ao processar sua mensagem. Tenta de novo?";

/// Reply used when the model keeps rate limiting after every retry
pub const BUSY_REPLY: &str = "⏳ Sistema muito ocupado agora. Espera uns segundinhos e tenta de novo?";

/// Cloud filter for listings requested from chat
const CHAT_LISTING_CLOUD: f64 = 100.0;

/// Service for the conversational assistant
pub struct ChatService;

impl ChatService {
    /// Full chat: look up data the message asks for, then ask the model
    pub async fn chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let generator = state.generator()?;
        let session = state.sessions.session(request.session_id.as_deref()).await;
        let mut ctx = session.lock().await;

        if let Some(update) = request.context_data {
            ctx.apply(update)?;
        }

        let normalized = normalize_slang(&request.message);
        let outcomes = Self::run_tools(state, &request.message, &ctx).await;
        let enriched = enrich_message(&normalized, &outcomes);

        let reply = match Self::converse(generator.as_ref(), &ctx, &enriched).await {
            Ok(reply) if reply.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(reply) => {
                ctx.record_exchange(request.message.as_str(), reply.as_str());
                reply
            }
            Err(e @ SentinelError::RateLimited { .. }) => {
                tracing::warn!(error = %e, "Generator still rate limited after retries");
                BUSY_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Generator failed, using fallback reply");
                fallback_response(&normalized, &mut rand::thread_rng())
            }
        };

        let response = dialectize(&reply, &mut rand::thread_rng());
        Ok(ChatResponse {
            response,
            context_summary: ctx.summary(),
        })
    }

    /// Text-only chat: no data lookups, canned reply when the model is unavailable
    pub async fn chat_text(
        state: &AppState,
        request: ChatRequest,
    ) -> Result<ChatResponse, ApiError> {
        let session = state.sessions.session(request.session_id.as_deref()).await;
        let mut ctx = session.lock().await;

        if let Some(update) = request.context_data {
            ctx.apply(update)?;
        }

        let normalized = normalize_slang(&request.message);
        let generated = match state.generator() {
            Ok(generator) => match Self::converse(generator.as_ref(), &ctx, &normalized).await {
                Ok(reply) => Some(reply),
                Err(e) => {
                    tracing::warn!(error = %e, "Generator failed, using fallback reply");
                    None
                }
            },
            Err(_) => None,
        };

        let reply = match generated {
            Some(reply) if !reply.trim().is_empty() => {
                ctx.record_exchange(request.message.as_str(), reply.as_str());
                reply
            }
            Some(_) => EMPTY_REPLY.to_string(),
            None => fallback_response(&normalized, &mut rand::thread_rng()),
        };

        let response = dialectize(&reply, &mut rand::thread_rng());
        Ok(ChatResponse {
            response,
            context_summary: ctx.summary(),
        })
    }

    async fn converse(
        generator: &dyn Generator,
        ctx: &ChatContext,
        message: &str,
    ) -> CoreResult<String> {
        let prompt = chat_prompt(&ctx.summary(), message);
        let request = GenerationRequest::new(prompt).with_history(ctx.history());
        generator.generate(&request).await
    }

    /// Run every matched lookup concurrently; failures are logged and left out
    async fn run_tools(state: &AppState, message: &str, ctx: &ChatContext) -> Vec<ToolOutcome> {
        let invocations = dispatch(message, ctx);
        if invocations.is_empty() {
            return Vec::new();
        }
        tracing::info!(count = invocations.len(), "Running chat lookups");

        let pending = invocations.iter().map(|inv| Self::run_tool(state, ctx, *inv));
        let results = join_all(pending).await;

        invocations
            .iter()
            .zip(results)
            .filter_map(|(inv, result)| match result {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::warn!(capability = ?inv.capability, error = %e, "Chat lookup failed");
                    None
                }
            })
            .collect()
    }

    async fn run_tool(
        state: &AppState,
        ctx: &ChatContext,
        invocation: Invocation,
    ) -> CoreResult<ToolOutcome> {
        match invocation.capability {
            Capability::AnalyzeGeojson => {
                let geojson = ctx.geojson.as_ref().ok_or_else(|| missing("geojson"))?;
                Ok(ToolOutcome::Features(summarize_features(geojson, None)))
            }
            Capability::ListImages => {
                let layer = required_layer(invocation)?;
                let query = ImageQuery {
                    polygon: loaded_polygon(ctx)?.clone(),
                    dates: full_period(ctx)?,
                    layer,
                    cloud_percentage: CHAT_LISTING_CLOUD,
                    specific_date: None,
                };
                let listing = state.earth()?.list_images(&query).await?;
                Ok(ToolOutcome::Images { layer, listing })
            }
            Capability::CalculateStatistics => {
                let layer = required_layer(invocation)?;
                let stats = state
                    .earth()?
                    .layer_statistics(loaded_polygon(ctx)?, layer, &full_period(ctx)?)
                    .await?;
                Ok(ToolOutcome::Statistics(stats))
            }
            Capability::AnalyzeSar => {
                let sar = state
                    .earth()?
                    .sar_backscatter(loaded_polygon(ctx)?, &full_period(ctx)?)
                    .await?;
                Ok(ToolOutcome::Sar(sar))
            }
            Capability::UrbanHeatIsland => {
                let uhi = state
                    .earth()?
                    .heat_island(loaded_polygon(ctx)?, &period_or_start(ctx)?)
                    .await?;
                Ok(ToolOutcome::HeatIsland(uhi))
            }
            Capability::WaterBodies => {
                let water = state
                    .earth()?
                    .water_bodies(loaded_polygon(ctx)?, &period_or_start(ctx)?)
                    .await?;
                Ok(ToolOutcome::Water(water))
            }
        }
    }
}

fn missing(field: &str) -> SentinelError {
    SentinelError::invalid(field, "not loaded in this session")
}

fn loaded_polygon(ctx: &ChatContext) -> CoreResult<&sentinel_core::models::Polygon> {
    ctx.polygon.as_ref().ok_or_else(|| missing("polygon"))
}

fn required_layer(invocation: Invocation) -> CoreResult<LayerType> {
    invocation.layer.ok_or_else(|| missing("layer"))
}

fn full_period(ctx: &ChatContext) -> CoreResult<DateRange> {
    ctx.date_range().ok_or_else(|| missing("date range"))
}

/// Loaded period, or only its first day when the end is unknown
fn period_or_start(ctx: &ChatContext) -> CoreResult<DateRange> {
    match (ctx.date_range(), ctx.start_date) {
        (Some(range), _) => Ok(range),
        (None, Some(start)) => Ok(DateRange::single_day(start)),
        (None, None) => Err(missing("start_date")),
    }
}
