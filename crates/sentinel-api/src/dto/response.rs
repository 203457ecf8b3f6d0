use std::collections::BTreeMap;

use sentinel_core::models::{DateRange, IndexStats, RiskAssessment, RiskLevel};
use serde::Serialize;
use serde_json::Value;

pub const SERVICE_NAME: &str = "Sentinel-IA API";

/// Data sources behind `/api/get_analysis_data`
pub const INDEX_SOURCES: &str = "Sentinel-2 (Índices) e Landsat-8 (LST)";

/// Root endpoint response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub gee_project: Option<String>,
    pub status: &'static str,
    pub paths: BTreeMap<&'static str, &'static str>,
}

impl RootResponse {
    pub fn new(gee_project: Option<String>) -> Self {
        let paths = BTreeMap::from([
            ("list_images", "/api/list_images"),
            ("get_tile", "/api/get_tile"),
            ("get_analysis_data", "/api/get_analysis_data"),
            ("dem", "/api/get_dem"),
            ("analyze_area", "/api/analyze_area"),
            ("geojson_list", "/api/geojson/list"),
            ("geojson_load", "/api/geojson/load?name=arquivo.geojson"),
            ("geojson_render_layer", "/api/geojson/render_layer"),
            ("agent_chat", "/api/agent/chat"),
            ("agent_health", "/api/agent/health"),
        ]);

        Self {
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            description: "API para imagens de satélite (GEE), DEM, GeoJSON e análise com Agente de IA.",
            gee_project,
            status: "running",
            paths,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub gee: &'static str,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceStatus,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(gee_ok: bool, timestamp: String) -> Self {
        Self {
            status: if gee_ok { "ok" } else { "degraded" },
            services: ServiceStatus { gee: if gee_ok { "ok" } else { "error" } },
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodResponse {
    pub start: String,
    pub end: String,
}

impl From<&DateRange> for PeriodResponse {
    fn from(range: &DateRange) -> Self {
        Self {
            start: range.start_str(),
            end: range.end_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisDataResponse {
    pub stats: IndexStats,
    pub period: PeriodResponse,
    pub satellite_source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DemResponse {
    #[serde(rename = "tileUrl")]
    pub tile_url: String,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct GeoJsonListResponse {
    pub files: Vec<String>,
}

/// Area risk response, in the flat layout the map client reads
#[derive(Debug, Serialize)]
pub struct AreaRiskResponse {
    pub area_km2: f64,
    pub avg_annual_temperature: f64,
    pub extreme_heat_days: u32,
    pub heat_island_risk: RiskLevel,
    pub vegetation_density: f64,
    pub vegetation_loss_risk: RiskLevel,
    pub flood_risk: RiskLevel,
    pub drought_risk: RiskLevel,
    pub environmental_risk: RiskLevel,
    pub favela_count: usize,
    pub social_vulnerability: RiskLevel,
    pub score: u32,
    pub ai_summary: String,
    pub recommendations: Vec<String>,
    pub period: PeriodResponse,
}

impl AreaRiskResponse {
    pub fn new(assessment: RiskAssessment, area_km2: f64, period: &DateRange) -> Self {
        let inputs = assessment.inputs;
        let breakdown = assessment.breakdown;
        let ai_summary = format!(
            "Área de {:.2} km² com risco ambiental {} (pontuação {}). Temperatura média de superfície de {:.1}°C e densidade de vegetação de {:.1}%.",
            area_km2,
            assessment.environmental_risk.label().to_lowercase(),
            assessment.score,
            inputs.avg_temp_c,
            inputs.vegetation_density,
        );

        Self {
            area_km2,
            avg_annual_temperature: round1(inputs.avg_temp_c),
            extreme_heat_days: inputs.extreme_heat_days,
            heat_island_risk: breakdown.heat_island,
            vegetation_density: round1(inputs.vegetation_density),
            vegetation_loss_risk: breakdown.vegetation_loss,
            flood_risk: breakdown.flood,
            drought_risk: breakdown.drought,
            environmental_risk: assessment.environmental_risk,
            favela_count: inputs.settlement_count,
            social_vulnerability: assessment.social_vulnerability,
            score: assessment.score,
            ai_summary,
            recommendations: assessment.recommendations,
            period: period.into(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub analysis: String,
    pub metadata: Value,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub context_summary: String,
}

/// Agent health response; `model` is absent when unavailable
#[derive(Debug, Serialize)]
pub struct AgentHealthResponse {
    pub status: &'static str,
    pub agent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub message: String,
    pub timestamp: String,
}
