use chrono::Utc;
use sentinel_core::chat::{region_prompt, RegionBrief, ANALYSIS_INSTRUCTION, ASSISTANT_NAME};
use sentinel_core::error::SentinelError;
use sentinel_core::models::{DateRange, Polygon};
use sentinel_llm::GenerationRequest;
use serde_json::json;

use crate::dto::{AgentAnalyzeRequest, AgentResponse, PeriodResponse, INDEX_SOURCES};
use crate::error::ApiError;
use crate::state::AppState;

/// Name the assistant reports in metadata
pub const AGENT_NAME: &str = ASSISTANT_NAME;

/// Service for written analyses of a region's indices
pub struct RegionService;

impl RegionService {
    pub async fn analyze(
        state: &AppState,
        request: &AgentAnalyzeRequest,
    ) -> Result<AgentResponse, ApiError> {
        let generator = state.generator()?;
        let polygon = Polygon::from_vertices(&request.polygon_coords)?;
        let period = DateRange::parse(&request.date_range.start, &request.date_range.end)?;

        let stats = state.earth()?.index_stats(&polygon, &period).await?;
        let (ndvi, ndwi, lst) = match (stats.ndvi_mean, stats.ndwi_mean, stats.lst_mean_celsius) {
            (Some(ndvi), Some(ndwi), Some(lst)) => (ndvi, ndwi, lst),
            (None, _, _) => return Err(missing("ndvi_mean")),
            (_, None, _) => return Err(missing("ndwi_mean")),
            (_, _, None) => return Err(missing("lst_mean_celsius")),
        };

        let center = polygon.center();
        let municipality = match state.geocoder.reverse(center).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Reverse geocoding failed");
                None
            }
        };

        let prompt = region_prompt(&RegionBrief {
            municipality: municipality.as_deref(),
            center,
            vertex_count: polygon.len(),
            period,
            satellite_source: INDEX_SOURCES,
            ndvi_mean: ndvi,
            ndwi_mean: ndwi,
            lst_mean_celsius: lst,
            user_context: &request.analysis_context,
        });

        tracing::info!(
            points = polygon.len(),
            municipality = municipality.as_deref().unwrap_or("-"),
            "Requesting region analysis"
        );

        let analysis = generator
            .generate(&GenerationRequest::new(prompt).with_system_instruction(ANALYSIS_INSTRUCTION))
            .await?;

        let metadata = json!({
            "agent": AGENT_NAME,
            "model": generator.model_name(),
            "timestamp": Utc::now().to_rfc3339(),
            "region_points": polygon.len(),
            "municipality": municipality,
            "data_source": INDEX_SOURCES,
            "analysis_period": PeriodResponse::from(&period),
            "input_stats": stats,
            "status": "success",
        });

        Ok(AgentResponse { analysis, metadata })
    }
}

fn missing(name: &str) -> ApiError {
    SentinelError::MissingStatistic {
        name: name.to_string(),
    }
    .into()
}
