use std::env;
use std::path::PathBuf;

use sentinel_core::config::{LayeredConfig, LlmProvider};
use sentinel_core::error::Result;
use sentinel_earth::ServiceAccountKey;

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "sentinel.toml";

/// Credentials, read from the environment only
#[derive(Default)]
pub struct Secrets {
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub service_account: Option<ServiceAccountKey>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let json_key = non_empty_var("GOOGLE_APPLICATION_CREDENTIALS_JSON");
        let encoded_key = non_empty_var("GOOGLE_APPLICATION_CREDENTIALS_BASE64");
        let service_account = if let Some(json) = json_key {
            Some(ServiceAccountKey::from_json(&json)?)
        } else if let Some(encoded) = encoded_key {
            Some(ServiceAccountKey::from_base64(&encoded)?)
        } else {
            None
        };

        Ok(Self {
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            service_account,
        })
    }

    /// API key for the given provider, if set
    pub fn llm_key(&self, provider: LlmProvider) -> Option<&str> {
        match provider {
            LlmProvider::Gemini => self.google_api_key.as_deref(),
            LlmProvider::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

/// API server configuration: layered settings plus secrets
pub struct ApiConfig {
    pub settings: LayeredConfig,
    pub secrets: Secrets,
}

impl ApiConfig {
    /// Defaults, then the config file, then environment variables
    pub fn load() -> Result<Self> {
        let mut settings = LayeredConfig::with_defaults();
        if let Some(path) = config_path() {
            tracing::info!(path = %path.display(), "Loading configuration file");
            settings = settings.load_from_file(&path)?;
        }
        let settings = settings.load_from_env();

        Ok(Self {
            settings,
            secrets: Secrets::from_env()?,
        })
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.settings.port.value)
    }

    /// GEE project, falling back to the one named in the service account key
    pub fn gee_project(&self) -> Option<String> {
        self.settings.gee_project.value.clone().or_else(|| {
            self.secrets.service_account.as_ref().and_then(|key| key.project_id.clone())
        })
    }
}

/// `SENTINEL_CONFIG` if set, otherwise `sentinel.toml` when it exists
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_var("SENTINEL_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.is_file().then_some(default)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
