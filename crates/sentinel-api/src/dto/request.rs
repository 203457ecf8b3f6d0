use chrono::NaiveDate;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::imagery::parse_date;
use sentinel_core::models::{ContextUpdate, DateRange, ImageQuery, LayerType, Polygon, Vertex};
use serde::Deserialize;

/// Default tile window, in days before today
pub const TILE_WINDOW_DAYS: u64 = 90;
/// Default listing and area-risk window, in days before today
pub const YEAR_WINDOW_DAYS: u64 = 365;

/// Layer listing and tile request body
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub polygon: Vec<Vertex>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_layer")]
    pub layer_type: String,
    #[serde(default = "default_cloud_percentage")]
    pub cloud_percentage: f64,
    /// Only imagery acquired on this day is used
    pub specific_date: Option<String>,
}

fn default_layer() -> String {
    LayerType::Sentinel2Rgb.as_str().to_string()
}

fn default_cloud_percentage() -> f64 {
    20.0
}

impl ImageRequest {
    pub fn to_query(&self, today: NaiveDate, default_days: u64) -> Result<ImageQuery> {
        if !(0.0..=100.0).contains(&self.cloud_percentage) {
            return Err(SentinelError::invalid("cloud_percentage", "must be between 0 and 100"));
        }

        Ok(ImageQuery {
            polygon: Polygon::from_vertices(&self.polygon)?,
            dates: DateRange::resolve(
                self.start_date.as_deref(),
                self.end_date.as_deref(),
                today,
                default_days,
            )?,
            layer: self.layer_type.parse()?,
            cloud_percentage: self.cloud_percentage,
            specific_date: self
                .specific_date
                .as_deref()
                .map(|d| parse_date("specific_date", d))
                .transpose()?,
        })
    }
}

/// Index statistics request body
#[derive(Debug, Deserialize)]
pub struct AnalysisDataRequest {
    pub polygon: Vec<Vertex>,
    pub start_date: String,
    pub end_date: String,
}

impl AnalysisDataRequest {
    pub fn parse(&self) -> Result<(Polygon, DateRange)> {
        let polygon = Polygon::from_vertices(&self.polygon)?;
        let dates = DateRange::parse(&self.start_date, &self.end_date)?;
        Ok((polygon, dates))
    }
}

/// Elevation request body
#[derive(Debug, Deserialize)]
pub struct DemRequest {
    pub polygon: Vec<Vertex>,
}

/// Area risk request body; the map client posts `[lng, lat]` pairs here
#[derive(Debug, Deserialize)]
pub struct AreaRiskRequest {
    pub polygon: Vec<Vertex>,
    pub area_km2: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoadQuery {
    pub name: String,
}

/// GeoJSON layer request body
#[derive(Debug, Deserialize)]
pub struct RenderLayerRequest {
    pub filename: String,
    pub polygon: Option<Vec<Vertex>>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodBody {
    pub start: String,
    pub end: String,
}

/// Region analysis request body
#[derive(Debug, Deserialize)]
pub struct AgentAnalyzeRequest {
    pub polygon_coords: Vec<Vertex>,
    #[serde(default)]
    pub analysis_context: String,
    pub date_range: PeriodBody,
}

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context_data: Option<ContextUpdate>,
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn request(value: serde_json::Value) -> ImageRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = request(json!({
            "polygon": [{"lat": -1.45, "lng": -48.5}, {"lat": -1.46, "lng": -48.48}, {"lat": -1.44, "lng": -48.47}]
        }));
        let query = req.to_query(today(), TILE_WINDOW_DAYS).unwrap();

        assert_eq!(query.layer, LayerType::Sentinel2Rgb);
        assert_eq!(query.cloud_percentage, 20.0);
        assert_eq!(query.dates.end, today());
        assert_eq!(query.dates.start, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert!(query.specific_date.is_none());
    }

    #[test]
    fn test_invalid_fields() {
        let base = json!({
            "polygon": [{"lat": -1.45, "lng": -48.5}, {"lat": -1.46, "lng": -48.48}, {"lat": -1.44, "lng": -48.47}]
        });

        let mut bad_cloud = base.clone();
        bad_cloud["cloud_percentage"] = json!(120);
        assert!(request(bad_cloud).to_query(today(), 90).is_err());

        let mut bad_layer = base.clone();
        bad_layer["layer_type"] = json!("INFRARED");
        assert!(request(bad_layer).to_query(today(), 90).is_err());

        let mut bad_date = base;
        bad_date["specific_date"] = json!("10/07/2024");
        assert!(request(bad_date).to_query(today(), 90).is_err());
    }

    #[test]
    fn test_area_risk_accepts_lng_lat_pairs() {
        let req: AreaRiskRequest = serde_json::from_value(json!({
            "polygon": [[-48.5, -1.45], [-48.48, -1.46], [-48.47, -1.44], [-48.5, -1.45]],
            "area_km2": 4.2
        }))
        .unwrap();
        let polygon = Polygon::from_vertices(&req.polygon).unwrap();
        assert_eq!(polygon.len(), 3);
        assert_eq!(polygon.vertices()[0].lat, -1.45);
    }
}
