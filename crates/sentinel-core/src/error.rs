//! Error types for Sentinel

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    // Validation errors
    #[error("Invalid polygon: {reason}")]
    InvalidPolygon { reason: String },

    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    // Imagery errors
    #[error("No imagery found for {layer}. {hint}")]
    NoImagery { layer: String, hint: String },

    #[error("Statistic '{name}' is unavailable: no valid pixels for the requested area and period")]
    MissingStatistic { name: String },

    #[error("Earth Engine request failed: {reason}")]
    EarthEngine { reason: String },

    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    // Generator errors
    #[error("Generator unavailable: {reason}. Try: {remediation}")]
    GeneratorUnavailable { reason: String, remediation: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Geocoder unavailable: {reason}")]
    GeocoderUnavailable { reason: String },

    // Dataset errors
    #[error("Dataset not found: {name}")]
    DatasetNotFound { name: String },

    #[error("Invalid dataset {name}: {reason}")]
    InvalidDataset { name: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SentinelError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an `EarthEngine` error
    pub fn earth_engine(reason: impl Into<String>) -> Self {
        Self::EarthEngine { reason: reason.into() }
    }

    /// Whether the error was caused by the caller rather than an upstream service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPolygon { .. }
                | Self::InvalidDateRange { .. }
                | Self::InvalidInput { .. }
                | Self::InvalidDataset { .. }
        )
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
