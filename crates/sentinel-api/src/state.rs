use std::sync::Arc;

use sentinel_core::error::{Result, SentinelError};
use sentinel_core::ports::{EarthEngine, Geocoder};
use sentinel_geo::{GeoJsonCatalog, SettlementIndex};
use sentinel_llm::Generator;

use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    /// Absent when no service account is configured
    pub earth: Option<Arc<dyn EarthEngine>>,
    /// Absent when no LLM API key is configured
    pub generator: Option<Arc<dyn Generator>>,
    pub geocoder: Arc<dyn Geocoder>,
    pub catalog: GeoJsonCatalog,
    pub settlements: Arc<SettlementIndex>,
    pub sessions: Arc<SessionStore>,
    pub gee_project: Option<String>,
}

impl AppState {
    pub fn new(geocoder: Arc<dyn Geocoder>, catalog: GeoJsonCatalog) -> Self {
        Self {
            earth: None,
            generator: None,
            geocoder,
            catalog,
            settlements: Arc::new(SettlementIndex::default()),
            sessions: Arc::new(SessionStore::new()),
            gee_project: None,
        }
    }

    pub fn with_earth(mut self, earth: Arc<dyn EarthEngine>, project: Option<String>) -> Self {
        self.earth = Some(earth);
        self.gee_project = project;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.sessions = Arc::new(SessionStore::with_capacity(capacity));
        self
    }

    pub fn with_settlements(mut self, settlements: SettlementIndex) -> Self {
        self.settlements = Arc::new(settlements);
        self
    }

    /// Earth Engine adapter, or an error naming the missing configuration
    pub fn earth(&self) -> Result<&Arc<dyn EarthEngine>> {
        self.earth.as_ref().ok_or_else(|| SentinelError::ConfigMissing {
            key: "GOOGLE_APPLICATION_CREDENTIALS_JSON".to_string(),
        })
    }

    pub fn generator(&self) -> Result<&Arc<dyn Generator>> {
        self.generator.as_ref().ok_or_else(|| SentinelError::GeneratorUnavailable {
            reason: "no LLM API key configured".to_string(),
            remediation: "Set GOOGLE_API_KEY or OPENAI_API_KEY".to_string(),
        })
    }
}
