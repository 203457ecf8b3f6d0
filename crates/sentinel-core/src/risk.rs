//! Area risk scoring
//!
//! Four independent threshold tables map physical measurements to ordinal
//! levels, which are then combined into one weighted score. Every table is
//! ordered so that a stricter level's predicate implies the looser ones.

use crate::error::{Result, SentinelError};
use crate::models::{
    AreaMeasurements, RiskAssessment, RiskBreakdown, RiskInputs, RiskLevel,
};

/// Settlements beyond this count add nothing to the score
pub const MAX_SETTLEMENT_BONUS: usize = 3;

/// Map mean NDVI in `[-1, 1]` to a vegetation density percentage
pub fn vegetation_density(ndvi_mean: f64) -> f64 {
    ((ndvi_mean + 1.0) * 50.0).clamp(0.0, 100.0)
}

pub fn heat_island_risk(avg_temp_c: f64, extreme_heat_days: u32) -> RiskLevel {
    if avg_temp_c > 32.0 || extreme_heat_days > 60 {
        RiskLevel::Critical
    } else if avg_temp_c > 30.0 || extreme_heat_days > 40 {
        RiskLevel::High
    } else if avg_temp_c > 28.0 || extreme_heat_days > 20 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn vegetation_loss_risk(vegetation_density: f64) -> RiskLevel {
    if vegetation_density < 20.0 {
        RiskLevel::Critical
    } else if vegetation_density < 35.0 {
        RiskLevel::High
    } else if vegetation_density < 50.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn flood_risk(elevation_m: f64, ndwi_mean: f64) -> RiskLevel {
    if elevation_m < 10.0 && ndwi_mean > 0.2 {
        RiskLevel::Critical
    } else if elevation_m < 20.0 && ndwi_mean > 0.0 {
        RiskLevel::High
    } else if elevation_m < 50.0 || ndwi_mean > 0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn drought_risk(ndwi_mean: f64) -> RiskLevel {
    if ndwi_mean < -0.4 {
        RiskLevel::Critical
    } else if ndwi_mean < -0.3 {
        RiskLevel::High
    } else if ndwi_mean < -0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Vulnerability level from the number of intersecting informal settlements
pub fn social_vulnerability(settlement_count: usize) -> RiskLevel {
    match settlement_count.min(MAX_SETTLEMENT_BONUS) {
        0 => RiskLevel::Low,
        1 => RiskLevel::Medium,
        2 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

/// Weighted score: heat island counts double, settlements add up to 3
pub fn overall_score(breakdown: &RiskBreakdown, settlement_count: usize) -> u32 {
    2 * breakdown.heat_island.weight()
        + breakdown.vegetation_loss.weight()
        + breakdown.flood.weight()
        + breakdown.drought.weight()
        + settlement_count.min(MAX_SETTLEMENT_BONUS) as u32
}

pub fn overall_level(score: u32) -> RiskLevel {
    match score {
        s if s >= 10 => RiskLevel::Critical,
        s if s >= 7 => RiskLevel::High,
        s if s >= 4 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

impl RiskInputs {
    /// Build model inputs, failing on the first statistic Earth Engine could not compute
    pub fn from_measurements(m: &AreaMeasurements, settlement_count: usize) -> Result<Self> {
        fn require<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| SentinelError::MissingStatistic { name: name.to_string() })
        }

        Ok(Self {
            avg_temp_c: require(m.avg_temp_c, "lst_mean_celsius")?,
            extreme_heat_days: require(m.extreme_heat_days, "extreme_heat_days")?,
            vegetation_density: vegetation_density(require(m.ndvi_mean, "ndvi_mean")?),
            ndwi_mean: require(m.ndwi_mean, "ndwi_mean")?,
            elevation_m: require(m.elevation_m, "elevation_mean")?,
            settlement_count,
        })
    }
}

pub fn breakdown(inputs: &RiskInputs) -> RiskBreakdown {
    RiskBreakdown {
        heat_island: heat_island_risk(inputs.avg_temp_c, inputs.extreme_heat_days),
        vegetation_loss: vegetation_loss_risk(inputs.vegetation_density),
        flood: flood_risk(inputs.elevation_m, inputs.ndwi_mean),
        drought: drought_risk(inputs.ndwi_mean),
    }
}

/// Score an area
pub fn assess(inputs: RiskInputs) -> RiskAssessment {
    let breakdown = breakdown(&inputs);
    let score = overall_score(&breakdown, inputs.settlement_count);
    let social = social_vulnerability(inputs.settlement_count);

    RiskAssessment {
        inputs,
        breakdown,
        social_vulnerability: social,
        score,
        environmental_risk: overall_level(score),
        recommendations: recommendations(&breakdown, social),
    }
}

fn recommendations(breakdown: &RiskBreakdown, social: RiskLevel) -> Vec<String> {
    let mut out = Vec::new();

    if breakdown.heat_island >= RiskLevel::High {
        out.push(
            "Ampliar a arborização urbana e criar corredores verdes para reduzir a temperatura de superfície.".to_string(),
        );
        out.push("Priorizar telhados frios e pavimentos permeáveis em novas obras.".to_string());
    } else if breakdown.heat_island == RiskLevel::Medium {
        out.push("Monitorar a temperatura de superfície nos meses mais quentes.".to_string());
    }

    if breakdown.vegetation_loss >= RiskLevel::High {
        out.push(
            "Recuperar a cobertura vegetal com reflorestamento e proteção de áreas verdes remanescentes.".to_string(),
        );
    } else if breakdown.vegetation_loss == RiskLevel::Medium {
        out.push("Proteger as áreas verdes existentes contra supressão.".to_string());
    }

    if breakdown.flood >= RiskLevel::High {
        out.push(
            "Revisar a drenagem urbana e mapear pontos de alagamento recorrentes.".to_string(),
        );
        out.push("Evitar novas ocupações em cotas baixas próximas a corpos d'água.".to_string());
    } else if breakdown.flood == RiskLevel::Medium {
        out.push("Manter limpos canais e bueiros antes do período chuvoso.".to_string());
    }

    if breakdown.drought >= RiskLevel::Medium {
        out.push("Planejar reservação de água e uso eficiente nos períodos secos.".to_string());
    }

    if social >= RiskLevel::Medium {
        out.push(
            "Incluir as comunidades vulneráveis da área nos planos de adaptação e defesa civil.".to_string(),
        );
    }

    if out.is_empty() {
        out.push("Manter o monitoramento periódico da área com imagens de satélite.".to_string());
    }

    out
}
