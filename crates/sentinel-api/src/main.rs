use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sentinel_core::config::LlmProvider;
use sentinel_earth::{EarthEngineClient, EarthEngineSettings, ServiceAccountAuth};
use sentinel_geo::{GeoJsonCatalog, NominatimGeocoder, SettlementIndex};
use sentinel_llm::{GeminiGenerator, Generator, OpenAiGenerator, ResilientGenerator, RetryPolicy};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentinel_api::{cors_layer, create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentinel_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::load().context("Failed to load configuration")?;
    let settings = &config.settings;

    for (key, (value, source)) in settings.to_inspection_map() {
        tracing::debug!(%key, %value, ?source, "Configuration value");
    }

    tracing::info!(
        port = settings.port.value,
        web_concurrency = settings.web_concurrency.value,
        data_dir = %settings.data_dir.value.display(),
        llm_provider = ?settings.llm_provider.value,
        "Starting Sentinel API server"
    );

    let timeout = Duration::from_secs(settings.http_timeout_secs.value);
    let geocoder = NominatimGeocoder::new().context("Failed to build geocoder")?;
    let catalog = GeoJsonCatalog::new(settings.data_dir.value.clone());
    let mut state = AppState::new(Arc::new(geocoder), catalog)
        .with_session_capacity(settings.max_sessions.value);

    let settlements_path = settings.data_dir.value.join(&settings.settlements_file.value);
    match SettlementIndex::load(&settlements_path) {
        Ok(index) => {
            tracing::info!(
                path = %settlements_path.display(),
                count = index.len(),
                "Settlement polygons loaded"
            );
            state = state.with_settlements(index);
        }
        Err(e) => {
            tracing::warn!(
                path = %settlements_path.display(),
                error = %e,
                "Settlement polygons unavailable, social vulnerability will be LOW"
            );
        }
    }

    match (&config.secrets.service_account, config.gee_project()) {
        (Some(key), Some(project)) => {
            let auth = ServiceAccountAuth::new(key.clone(), timeout)
                .context("Invalid service account")?;
            let mut earth_settings = EarthEngineSettings::new(project.clone());
            earth_settings.concurrency = settings.web_concurrency.value.max(1);
            earth_settings.timeout = timeout;
            earth_settings.thermal_cutoff = settings.thermal_cutoff.value;

            let client = EarthEngineClient::new(earth_settings, Arc::new(auth))
                .context("Failed to build Earth Engine client")?;
            tracing::info!(%project, account = %key.client_email, "Earth Engine configured");
            state = state.with_earth(Arc::new(client), Some(project));
        }
        (None, _) => {
            tracing::warn!(
                "GOOGLE_APPLICATION_CREDENTIALS_JSON not set, imagery endpoints will answer 503"
            );
        }
        (Some(_), None) => {
            tracing::warn!(
                "GEE_PROJECT_ID not set and missing from the service account, \
                 imagery endpoints will answer 503"
            );
        }
    }

    let provider = settings.llm_provider.value;
    match config.secrets.llm_key(provider) {
        Some(api_key) => {
            let model = settings.effective_llm_model();
            let inner: Arc<dyn Generator> = match provider {
                LlmProvider::Gemini => {
                    Arc::new(GeminiGenerator::new(api_key, model.as_str(), timeout)?)
                }
                LlmProvider::OpenAi => {
                    Arc::new(OpenAiGenerator::new(api_key, model.as_str(), timeout)?)
                }
            };
            let generator = ResilientGenerator::new(
                inner,
                RetryPolicy::default(),
                Duration::from_secs(settings.throttle_secs.value),
            );
            tracing::info!(%model, "Language model configured");
            state = state.with_generator(Arc::new(generator));
        }
        None => {
            tracing::warn!(
                key = provider.api_key_var(),
                "LLM API key not set, the assistant will use canned replies"
            );
        }
    }

    let origins = settings.allowed_origins();
    let cors = cors_layer(&origins, settings.cors_suffix.value.as_deref());
    let app = create_router(Arc::new(state)).layer(cors).layer(TraceLayer::new_for_http());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!(origins = ?origins, "CORS enabled");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
