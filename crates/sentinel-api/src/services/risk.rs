use chrono::NaiveDate;
use sentinel_core::models::{DateRange, Polygon, RiskInputs};
use sentinel_core::risk::assess;
use sentinel_geo::area_km2;

use crate::dto::{AreaRiskRequest, AreaRiskResponse, YEAR_WINDOW_DAYS};
use crate::error::ApiError;
use crate::state::AppState;

/// Service for scoring environmental and social risk over an area
pub struct RiskService;

impl RiskService {
    /// Measure the area remotely, count settlements locally, then score
    pub async fn analyze(
        state: &AppState,
        request: &AreaRiskRequest,
        today: NaiveDate,
    ) -> Result<AreaRiskResponse, ApiError> {
        let polygon = Polygon::from_vertices(&request.polygon)?;
        let dates = DateRange::resolve(
            request.start_date.as_deref(),
            request.end_date.as_deref(),
            today,
            YEAR_WINDOW_DAYS,
        )?;
        let area = request
            .area_km2
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or_else(|| area_km2(&polygon));

        let measurements = state.earth()?.area_measurements(&polygon, &dates).await?;
        let settlements = state.settlements.count_intersecting(&polygon);
        let inputs = RiskInputs::from_measurements(&measurements, settlements)?;
        let assessment = assess(inputs);

        tracing::info!(
            area_km2 = area,
            settlements,
            score = assessment.score,
            level = %assessment.environmental_risk,
            "Area risk assessed"
        );

        Ok(AreaRiskResponse::new(assessment, area, &dates))
    }
}
