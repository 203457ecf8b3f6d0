use crate::error::{Result, SentinelError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default archive cutoff for Landsat thermal searches
pub const DEFAULT_THERMAL_CUTOFF: &str = "2024-12-31";

/// Chat sessions kept in memory before the least recently used is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Hosted text generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    OpenAi,
}

impl LlmProvider {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-2.0-flash-exp",
            LlmProvider::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable holding the provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "GOOGLE_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Layered configuration for the Sentinel service
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub port: ConfigValue<u16>,
    pub web_concurrency: ConfigValue<usize>,
    pub data_dir: ConfigValue<PathBuf>,
    pub cors_origins: ConfigValue<Vec<String>>,
    pub cors_suffix: ConfigValue<Option<String>>,
    pub frontend_url: ConfigValue<Option<String>>,
    pub llm_provider: ConfigValue<LlmProvider>,
    pub llm_model: ConfigValue<Option<String>>,
    pub throttle_secs: ConfigValue<u64>,
    pub http_timeout_secs: ConfigValue<u64>,
    pub thermal_cutoff: ConfigValue<Option<NaiveDate>>,
    pub settlements_file: ConfigValue<String>,
    pub gee_project: ConfigValue<Option<String>>,
    pub max_sessions: ConfigValue<usize>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            port: ConfigValue::new(8000, ConfigSource::Default),
            web_concurrency: ConfigValue::new(4, ConfigSource::Default),
            data_dir: ConfigValue::new(PathBuf::from("data"), ConfigSource::Default),
            cors_origins: ConfigValue::new(
                vec!["http://localhost:5173".to_string(), "http://localhost:3000".to_string()],
                ConfigSource::Default,
            ),
            cors_suffix: ConfigValue::new(None, ConfigSource::Default),
            frontend_url: ConfigValue::new(None, ConfigSource::Default),
            llm_provider: ConfigValue::new(LlmProvider::Gemini, ConfigSource::Default),
            llm_model: ConfigValue::new(None, ConfigSource::Default),
            throttle_secs: ConfigValue::new(5, ConfigSource::Default),
            http_timeout_secs: ConfigValue::new(60, ConfigSource::Default),
            thermal_cutoff: ConfigValue::new(
                NaiveDate::parse_from_str(DEFAULT_THERMAL_CUTOFF, "%Y-%m-%d").ok(),
                ConfigSource::Default,
            ),
            settlements_file: ConfigValue::new(
                "favelas.geojson".to_string(),
                ConfigSource::Default,
            ),
            gee_project: ConfigValue::new(None, ConfigSource::Default),
            max_sessions: ConfigValue::new(DEFAULT_MAX_SESSIONS, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SentinelError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| SentinelError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(port) = file_config.port {
            self.port.update(port, ConfigSource::File);
        }

        if let Some(workers) = file_config.web_concurrency {
            self.web_concurrency.update(workers.max(1), ConfigSource::File);
        }

        if let Some(data_dir) = file_config.data_dir {
            self.data_dir.update(data_dir, ConfigSource::File);
        }

        if let Some(origins) = file_config.cors_origins {
            self.cors_origins.update(origins, ConfigSource::File);
        }

        if let Some(suffix) = file_config.cors_suffix {
            self.cors_suffix.update(Some(suffix), ConfigSource::File);
        }

        if let Some(url) = file_config.frontend_url {
            self.frontend_url.update(Some(url), ConfigSource::File);
        }

        if let Some(provider) = file_config.llm_provider {
            self.llm_provider.update(parse_llm_provider(&provider)?, ConfigSource::File);
        }

        if let Some(model) = file_config.llm_model {
            self.llm_model.update(Some(model), ConfigSource::File);
        }

        if let Some(secs) = file_config.throttle_secs {
            self.throttle_secs.update(secs, ConfigSource::File);
        }

        if let Some(secs) = file_config.http_timeout_secs {
            self.http_timeout_secs.update(secs, ConfigSource::File);
        }

        if let Some(cutoff) = file_config.thermal_cutoff {
            self.thermal_cutoff.update(parse_cutoff(&cutoff)?, ConfigSource::File);
        }

        if let Some(file) = file_config.settlements_file {
            self.settlements_file.update(file, ConfigSource::File);
        }

        if let Some(project) = file_config.gee_project {
            self.gee_project.update(Some(project), ConfigSource::File);
        }

        if let Some(max) = file_config.max_sessions {
            self.max_sessions.update(max.max(1), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // PORT
        if let Ok(port_str) = env::var("PORT") {
            match port_str.trim().parse::<u16>() {
                Ok(port) => self.port.update(port, ConfigSource::Environment),
                Err(_) => {
                    tracing::warn!("Invalid PORT value '{}': expected a port number", port_str)
                }
            }
        }

        // WEB_CONCURRENCY
        if let Ok(workers_str) = env::var("WEB_CONCURRENCY") {
            match workers_str.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => {
                    self.web_concurrency.update(workers, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid WEB_CONCURRENCY value '{}': expected a positive integer",
                    workers_str
                ),
            }
        }

        // FRONTEND_URL
        if let Ok(url) = env::var("FRONTEND_URL") {
            if !url.trim().is_empty() {
                self.frontend_url.update(Some(url.trim().to_string()), ConfigSource::Environment);
            }
        }

        // SENTINEL_DATA_DIR
        if let Ok(dir) = env::var("SENTINEL_DATA_DIR") {
            self.data_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // SENTINEL_CORS_ORIGINS
        if let Ok(origins) = env::var("SENTINEL_CORS_ORIGINS") {
            self.cors_origins.update(parse_origin_list(&origins), ConfigSource::Environment);
        }

        // SENTINEL_CORS_SUFFIX
        if let Ok(suffix) = env::var("SENTINEL_CORS_SUFFIX") {
            let suffix = suffix.trim();
            let value = (!suffix.is_empty()).then(|| suffix.to_string());
            self.cors_suffix.update(value, ConfigSource::Environment);
        }

        // SENTINEL_LLM_PROVIDER
        if let Ok(provider_str) = env::var("SENTINEL_LLM_PROVIDER") {
            match parse_llm_provider(&provider_str) {
                Ok(provider) => self.llm_provider.update(provider, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENTINEL_LLM_PROVIDER value '{}': expected gemini or openai",
                    provider_str
                ),
            }
        }

        // SENTINEL_LLM_MODEL
        if let Ok(model) = env::var("SENTINEL_LLM_MODEL") {
            self.llm_model.update(Some(model), ConfigSource::Environment);
        }

        // SENTINEL_THROTTLE_SECS
        if let Ok(secs_str) = env::var("SENTINEL_THROTTLE_SECS") {
            match secs_str.trim().parse::<u64>() {
                Ok(secs) => self.throttle_secs.update(secs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENTINEL_THROTTLE_SECS value '{}': expected seconds",
                    secs_str
                ),
            }
        }

        // SENTINEL_HTTP_TIMEOUT_SECS
        if let Ok(secs_str) = env::var("SENTINEL_HTTP_TIMEOUT_SECS") {
            match secs_str.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    self.http_timeout_secs.update(secs, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid SENTINEL_HTTP_TIMEOUT_SECS value '{}': expected positive seconds",
                    secs_str
                ),
            }
        }

        // SENTINEL_THERMAL_CUTOFF
        if let Ok(cutoff_str) = env::var("SENTINEL_THERMAL_CUTOFF") {
            match parse_cutoff(&cutoff_str) {
                Ok(cutoff) => self.thermal_cutoff.update(cutoff, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SENTINEL_THERMAL_CUTOFF value '{}': expected YYYY-MM-DD or none",
                    cutoff_str
                ),
            }
        }

        // SENTINEL_SETTLEMENTS_FILE
        if let Ok(file) = env::var("SENTINEL_SETTLEMENTS_FILE") {
            self.settlements_file.update(file, ConfigSource::Environment);
        }

        // SENTINEL_MAX_SESSIONS
        if let Ok(max_str) = env::var("SENTINEL_MAX_SESSIONS") {
            match max_str.trim().parse::<usize>() {
                Ok(max) if max > 0 => self.max_sessions.update(max, ConfigSource::Environment),
                _ => tracing::warn!(
                    "Invalid SENTINEL_MAX_SESSIONS value '{}': expected a positive integer",
                    max_str
                ),
            }
        }

        // GEE_PROJECT_ID, then the older D_DO_PROJETO_GEE
        if let Some(project) = ["GEE_PROJECT_ID", "D_DO_PROJETO_GEE"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|v| !v.trim().is_empty())
        {
            self.gee_project.update(Some(project.trim().to_string()), ConfigSource::Environment);
        }

        self
    }

    /// Model name after applying the provider default
    pub fn effective_llm_model(&self) -> String {
        self.llm_model
            .value
            .clone()
            .unwrap_or_else(|| self.llm_provider.value.default_model().to_string())
    }

    /// Exact origins allowed by CORS, including the frontend URL with and without a trailing slash
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = self.cors_origins.value.clone();
        if let Some(url) = &self.frontend_url.value {
            for candidate in [url.clone(), url.trim_end_matches('/').to_string()] {
                if !origins.contains(&candidate) {
                    origins.push(candidate);
                }
            }
        }
        origins
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        fn optional<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_else(|| "(none)".to_string())
        }

        let mut map = HashMap::new();

        map.insert("port".to_string(), (self.port.value.to_string(), self.port.source));

        map.insert(
            "web_concurrency".to_string(),
            (self.web_concurrency.value.to_string(), self.web_concurrency.source),
        );

        map.insert(
            "data_dir".to_string(),
            (self.data_dir.value.display().to_string(), self.data_dir.source),
        );

        map.insert(
            "cors_origins".to_string(),
            (self.cors_origins.value.join(","), self.cors_origins.source),
        );

        map.insert(
            "cors_suffix".to_string(),
            (optional(&self.cors_suffix.value), self.cors_suffix.source),
        );

        map.insert(
            "frontend_url".to_string(),
            (optional(&self.frontend_url.value), self.frontend_url.source),
        );

        map.insert(
            "llm_provider".to_string(),
            (format!("{:?}", self.llm_provider.value), self.llm_provider.source),
        );

        map.insert("llm_model".to_string(), (self.effective_llm_model(), self.llm_model.source));

        map.insert(
            "throttle_secs".to_string(),
            (self.throttle_secs.value.to_string(), self.throttle_secs.source),
        );

        map.insert(
            "http_timeout_secs".to_string(),
            (self.http_timeout_secs.value.to_string(), self.http_timeout_secs.source),
        );

        map.insert(
            "thermal_cutoff".to_string(),
            (optional(&self.thermal_cutoff.value), self.thermal_cutoff.source),
        );

        map.insert(
            "settlements_file".to_string(),
            (self.settlements_file.value.clone(), self.settlements_file.source),
        );

        map.insert(
            "gee_project".to_string(),
            (optional(&self.gee_project.value), self.gee_project.source),
        );

        map.insert(
            "max_sessions".to_string(),
            (self.max_sessions.value.to_string(), self.max_sessions.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    port: Option<u16>,
    web_concurrency: Option<usize>,
    data_dir: Option<PathBuf>,
    cors_origins: Option<Vec<String>>,
    cors_suffix: Option<String>,
    frontend_url: Option<String>,
    llm_provider: Option<String>,
    llm_model: Option<String>,
    throttle_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    thermal_cutoff: Option<String>,
    settlements_file: Option<String>,
    gee_project: Option<String>,
    max_sessions: Option<usize>,
}

/// Parse LLM provider from string
pub fn parse_llm_provider(s: &str) -> Result<LlmProvider> {
    match s.trim().to_lowercase().as_str() {
        "gemini" | "google" => Ok(LlmProvider::Gemini),
        "openai" | "gpt" => Ok(LlmProvider::OpenAi),
        _ => Err(SentinelError::ConfigInvalid {
            key: "llm_provider".to_string(),
            reason: format!("Invalid LLM provider: {}. Use gemini or openai", s),
        }),
    }
}

/// Parse a thermal cutoff date; `none` disables the cutoff
pub fn parse_cutoff(s: &str) -> Result<Option<NaiveDate>> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("none") || trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(Some).map_err(|e| {
        SentinelError::ConfigInvalid {
            key: "thermal_cutoff".to_string(),
            reason: format!("Invalid date '{}': {}", s, e),
        }
    })
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origin_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.port.value, 8000);
        assert_eq!(config.port.source, ConfigSource::Default);
        assert_eq!(config.web_concurrency.value, 4);
        assert_eq!(config.llm_provider.value, LlmProvider::Gemini);
        assert_eq!(config.effective_llm_model(), "gemini-2.0-flash-exp");
        assert_eq!(
            config.thermal_cutoff.value,
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // Lower precedence should not override
        value.update(400, ConfigSource::File);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 9000
web_concurrency = 8
cors_origins = ["https://sentinel.example.org"]
cors_suffix = ".vercel.app"
llm_provider = "openai"
thermal_cutoff = "none"
settlements_file = "comunidades.geojson"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.port.value, 9000);
        assert_eq!(config.port.source, ConfigSource::File);
        assert_eq!(config.web_concurrency.value, 8);
        assert_eq!(config.cors_origins.value, vec!["https://sentinel.example.org"]);
        assert_eq!(config.cors_suffix.value.as_deref(), Some(".vercel.app"));
        assert_eq!(config.llm_provider.value, LlmProvider::OpenAi);
        assert_eq!(config.effective_llm_model(), "gpt-4o-mini");
        assert_eq!(config.thermal_cutoff.value, None);
        assert_eq!(config.settlements_file.value, "comunidades.geojson");
        // Untouched values keep their defaults
        assert_eq!(config.throttle_secs.source, ConfigSource::Default);
    }

    #[test]
    fn test_invalid_provider_in_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"llm_provider = "ollama""#).unwrap();

        let result = LayeredConfig::with_defaults().load_from_file(file.path());
        assert!(matches!(result, Err(SentinelError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_allowed_origins_include_frontend_variants() {
        let mut config = LayeredConfig::with_defaults();
        config.frontend_url.update(
            Some("https://sentinel.example.org/".to_string()),
            ConfigSource::Environment,
        );

        let origins = config.allowed_origins();
        assert!(origins.contains(&"http://localhost:5173".to_string()));
        assert!(origins.contains(&"https://sentinel.example.org/".to_string()));
        assert!(origins.contains(&"https://sentinel.example.org".to_string()));
    }

    #[test]
    fn test_parse_llm_provider() {
        assert_eq!(parse_llm_provider("gemini").unwrap(), LlmProvider::Gemini);
        assert_eq!(parse_llm_provider("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert!(parse_llm_provider("claude").is_err());
    }

    #[test]
    fn test_parse_cutoff() {
        assert_eq!(parse_cutoff("none").unwrap(), None);
        assert_eq!(parse_cutoff("2023-06-30").unwrap(), NaiveDate::from_ymd_opt(2023, 6, 30));
        assert!(parse_cutoff("june").is_err());
    }

    #[test]
    fn test_parse_origin_list() {
        assert_eq!(
            parse_origin_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert!(map.contains_key("port"));
        assert!(map.contains_key("llm_model"));
        assert!(map.contains_key("thermal_cutoff"));

        let (cutoff, source) = &map["thermal_cutoff"];
        assert_eq!(cutoff, "2024-12-31");
        assert_eq!(*source, ConfigSource::Default);

        let (project, _) = &map["gee_project"];
        assert_eq!(project, "(none)");
    }
}
