//! Reverse geocoding through Nominatim

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::Coordinate;
use sentinel_core::ports::Geocoder;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const USER_AGENT: &str = "Sentinel-IA-Sacy/1.0";
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Nominatim reverse geocoder returning "City, State" labels
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
}

impl Address {
    fn label(self) -> Option<String> {
        let city = self.city.or(self.town).or(self.village).or(self.municipality);
        match (city, self.state) {
            (Some(city), Some(state)) => Some(format!("{}, {}", city, state)),
            (Some(city), None) => Some(city),
            (None, Some(state)) => Some(state),
            (None, None) => None,
        }
    }
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(NOMINATIM_URL)
    }

    /// Create a geocoder against another Nominatim-compatible endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(GEOCODE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SentinelError::GeocoderUnavailable { reason: e.to_string() })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, at: Coordinate) -> Result<Option<String>> {
        let lat = at.lat.to_string();
        let lon = at.lng.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
            ],
        )
        .map_err(|e| SentinelError::GeocoderUnavailable { reason: e.to_string() })?;

        tracing::debug!(lat = at.lat, lng = at.lng, "Reverse geocoding");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "pt-BR")
            .send()
            .await
            .map_err(|e| SentinelError::GeocoderUnavailable { reason: e.to_string() })?;

        if !response.status().is_success() {
            return Err(SentinelError::GeocoderUnavailable {
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body: ReverseResponse = response
            .json()
            .await
            .map_err(|e| SentinelError::GeocoderUnavailable { reason: e.to_string() })?;

        Ok(body.address.label())
    }
}
