use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] =
        [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical];

    /// Score contribution, 0 for LOW up to 3 for CRITICAL
    pub fn weight(&self) -> u32 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Portuguese label shown to end users
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Baixo",
            RiskLevel::Medium => "Médio",
            RiskLevel::High => "Alto",
            RiskLevel::Critical => "Crítico",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of the area risk model, all required
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub avg_temp_c: f64,
    pub extreme_heat_days: u32,
    /// Percentage in `[0, 100]` derived from mean NDVI
    pub vegetation_density: f64,
    pub ndwi_mean: f64,
    pub elevation_m: f64,
    pub settlement_count: usize,
}

/// The four independent category levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub heat_island: RiskLevel,
    pub vegetation_loss: RiskLevel,
    pub flood: RiskLevel,
    pub drought: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub inputs: RiskInputs,
    pub breakdown: RiskBreakdown,
    pub social_vulnerability: RiskLevel,
    pub score: u32,
    pub environmental_risk: RiskLevel,
    pub recommendations: Vec<String>,
}
