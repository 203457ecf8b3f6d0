//! Earth Engine REST adapter
//!
//! Every operation builds an expression graph and sends it to
//! `projects/{project}/value:compute` or `projects/{project}/maps`. Calls are
//! bounded by a semaphore so a burst of requests cannot exhaust the project's
//! concurrent-request quota.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::imagery::{DATE_FORMAT, LISTING_LIMIT, WATER_NDWI_THRESHOLD};
use sentinel_core::models::{
    AreaMeasurements, DateRange, ElevationSummary, HeatIslandSummary, ImageListing, ImageQuery,
    ImageSummary, IndexStats, LayerStatistics, LayerTile, LayerType, Polygon, SarSummary, Sensor,
    WaterSummary,
};
use sentinel_core::ports::EarthEngine;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::auth::AccessTokenSource;
use crate::expr::Expr;
use crate::indices::{self, VisParams};

pub const EARTH_ENGINE_URL: &str = "https://earthengine.googleapis.com/v1";

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Connection settings for [`EarthEngineClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct EarthEngineSettings {
    pub project: String,
    pub base_url: String,
    /// Maximum Earth Engine calls in flight
    pub concurrency: usize,
    pub timeout: Duration,
    /// Last date searched for Landsat-backed layers
    pub thermal_cutoff: Option<NaiveDate>,
}

impl EarthEngineSettings {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            base_url: EARTH_ENGINE_URL.to_string(),
            concurrency: 4,
            timeout: Duration::from_secs(60),
            thermal_cutoff: None,
        }
    }
}

pub struct EarthEngineClient {
    http: reqwest::Client,
    auth: Arc<dyn AccessTokenSource>,
    settings: EarthEngineSettings,
    permits: Semaphore,
}

/// What a tile request renders, and how to check imagery exists first
struct TilePlan {
    /// Filtered collection that must not be empty
    candidates: Option<Expr>,
    /// Single scene whose acquisition date labels the tile
    dated_scene: Option<Expr>,
    image: Expr,
    vis: VisParams,
}

impl EarthEngineClient {
    pub fn new(settings: EarthEngineSettings, auth: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                SentinelError::earth_engine(format!("Failed to build HTTP client: {}", e))
            })?;
        let permits = Semaphore::new(settings.concurrency.max(1));

        Ok(Self {
            http,
            auth,
            settings,
            permits,
        })
    }

    pub fn settings(&self) -> &EarthEngineSettings {
        &self.settings
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/projects/{}/{}", self.settings.base_url, self.settings.project, method)
    }

    fn thermal_window(&self, dates: &DateRange) -> DateRange {
        match self.settings.thermal_cutoff {
            Some(cutoff) => dates.clamp_to(cutoff),
            None => *dates,
        }
    }

    async fn post(&self, url: String, body: Value) -> Result<Value> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SentinelError::earth_engine("request pool closed"))?;
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                SentinelError::earth_engine(format!("Failed to reach Earth Engine: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(failure(status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| SentinelError::earth_engine(format!("Failed to parse response: {}", e)))
    }

    /// Evaluate an expression and return its `result` value
    pub async fn compute(&self, expr: &Expr) -> Result<Value> {
        let body = json!({ "expression": expr.to_expression() });
        let mut response = self.post(self.project_url("value:compute"), body).await?;
        Ok(response.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Register a visualized image and return its XYZ tile URL template
    pub async fn tile_url(&self, visualized: &Expr) -> Result<String> {
        let body = json!({
            "expression": visualized.to_expression(),
            "fileFormat": "AUTO_JPEG_PNG"
        });
        let response = self.post(self.project_url("maps"), body).await?;
        let name = response
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SentinelError::earth_engine("map response has no name"))?;

        Ok(format!("{}/{}/tiles/{{z}}/{{x}}/{{y}}", self.settings.base_url, name))
    }

    async fn count(&self, collection: &Expr) -> Result<u64> {
        let result = self.compute(&collection.clone().size()).await?;
        Ok(result.as_u64().unwrap_or(0))
    }

    fn plan_tile(&self, query: &ImageQuery, window: &DateRange) -> TilePlan {
        let geometry = Expr::polygon(&query.polygon);
        let clouds = Some(query.cloud_percentage);
        let exact = query.specific_date.is_some();
        let fixed_vis = VisParams::for_layer(query.layer);
        let vis = fixed_vis.unwrap_or_else(|| VisParams::elevation(None, None));

        let newest = |collection: Expr| collection.sort(indices::TIME_START, false);

        match query.layer {
            LayerType::Sentinel2Rgb | LayerType::Ndvi | LayerType::Ndwi => {
                let candidates = indices::sentinel2(&geometry, window, clouds);
                let scene = newest(candidates.clone()).first();
                let image = match query.layer {
                    LayerType::Ndvi => indices::ndvi(scene.clone()),
                    LayerType::Ndwi => indices::ndwi(scene.clone()),
                    _ => scene.clone(),
                };
                TilePlan {
                    candidates: Some(candidates),
                    dated_scene: Some(scene),
                    image: image.clip(geometry),
                    vis,
                }
            }
            LayerType::LandsatRgb => {
                let candidates = indices::landsat(&geometry, window, clouds);
                let scene = newest(candidates.clone()).first();
                TilePlan {
                    candidates: Some(candidates),
                    dated_scene: Some(scene.clone()),
                    image: indices::landsat_rgb(scene).clip(geometry),
                    vis,
                }
            }
            LayerType::Sentinel1Vv | LayerType::Sar => {
                let candidates = indices::sentinel1_vv(&geometry, window);
                let scene = newest(candidates.clone()).first();
                TilePlan {
                    candidates: Some(candidates),
                    dated_scene: Some(scene.clone()),
                    image: scene.select(&["VV"]).clip(geometry),
                    vis,
                }
            }
            LayerType::Lst | LayerType::Uhi | LayerType::Utfvi => {
                let candidates = indices::landsat(&geometry, window, clouds);
                let composite = indices::thermal_composite(candidates.clone(), exact);
                let lst = indices::lst_celsius(composite.clone()).clip(geometry.clone());
                let image = match query.layer {
                    LayerType::Uhi => {
                        let stats = lst.clone().reduce_region(
                            Expr::reducer("Reducer.mean").combine(Expr::reducer("Reducer.stdDev")),
                            geometry,
                            indices::LANDSAT_SCALE_M,
                        );
                        indices::uhi(lst, stats.clone().get("LST_mean"), stats.get("LST_stdDev"))
                    }
                    LayerType::Utfvi => {
                        let stats = lst.clone().reduce_region(
                            Expr::reducer("Reducer.mean"),
                            geometry,
                            indices::LANDSAT_SCALE_M,
                        );
                        indices::utfvi(lst, stats.get("LST"))
                    }
                    _ => lst,
                };
                TilePlan {
                    candidates: Some(candidates),
                    dated_scene: exact.then_some(composite),
                    image,
                    vis,
                }
            }
            LayerType::Dem => TilePlan {
                candidates: None,
                dated_scene: None,
                image: Expr::image(indices::SRTM).select(&["elevation"]).clip(geometry),
                vis,
            },
        }
    }
}

/// Turn an Earth Engine error response into a domain error
fn failure(status: reqwest::StatusCode, body: &str) -> SentinelError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return SentinelError::Auth {
            reason: format!("Earth Engine rejected credentials: {}", message),
        };
    }
    SentinelError::earth_engine(format!("HTTP {}: {}", status.as_u16(), message))
}

fn no_imagery(layer: LayerType, window: &DateRange, cutoff: Option<NaiveDate>) -> SentinelError {
    let mut hint = format!(
        "Nenhuma imagem encontrada entre {} e {}. Tente um período maior ou uma área diferente.",
        window.start_str(),
        window.end_str()
    );
    if let (Some(cutoff), true) = (cutoff, layer.uses_cutoff()) {
        hint.push_str(&format!(
            " Imagens Landsat são consultadas até {}.",
            cutoff.format(DATE_FORMAT)
        ));
    }
    SentinelError::NoImagery {
        layer: layer.to_string(),
        hint,
    }
}

/// `system:time_start` milliseconds as a calendar date
pub(crate) fn epoch_millis_to_date(millis: f64) -> Option<String> {
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.format(DATE_FORMAT).to_string())
}

fn satellite_name(spacecraft: Option<&str>, sensor: Sensor) -> String {
    match spacecraft {
        Some(id) if id.contains("LANDSAT_8") => "Landsat 8".to_string(),
        Some(id) if id.contains("LANDSAT_9") => "Landsat 9".to_string(),
        _ => sensor.display_name().to_string(),
    }
}

/// Build a listing from parallel `times`, `clouds` and `spacecraft` arrays
pub(crate) fn parse_listing(result: &Value, sensor: Sensor) -> ImageListing {
    let column = |key: &str| {
        result
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let times = column("times");
    let clouds = column("clouds");
    let spacecraft = column("spacecraft");

    let images: Vec<ImageSummary> = times
        .iter()
        .enumerate()
        .map(|(i, time)| {
            let cloud_cover = clouds.get(i).and_then(Value::as_f64).unwrap_or(0.0);
            ImageSummary {
                date: time
                    .as_f64()
                    .and_then(epoch_millis_to_date)
                    .unwrap_or_else(|| "Data desconhecida".to_string()),
                cloud_cover: (cloud_cover * 100.0).round() / 100.0,
                satellite: satellite_name(spacecraft.get(i).and_then(Value::as_str), sensor),
            }
        })
        .collect();

    let total_found = result
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(images.len() as u64);
    ImageListing {
        images,
        total_found,
    }
}

fn stat(value: &Value, pointer: &str) -> Option<f64> {
    value.pointer(pointer).and_then(Value::as_f64)
}

fn required(value: &Value, pointer: &str, name: &str) -> Result<f64> {
    stat(value, pointer).ok_or_else(|| SentinelError::MissingStatistic {
        name: name.to_string(),
    })
}

#[async_trait]
impl EarthEngine for EarthEngineClient {
    async fn list_images(&self, query: &ImageQuery) -> Result<ImageListing> {
        let geometry = Expr::polygon(&query.polygon);
        let window = query.search_window(self.settings.thermal_cutoff);
        let clouds = Some(query.cloud_percentage);
        let sensor = query.layer.sensor();

        let (collection, cloud_property) = match sensor {
            Sensor::Sentinel2 => (
                indices::sentinel2(&geometry, &window, clouds),
                Some(indices::S2_CLOUD_PROPERTY),
            ),
            Sensor::Landsat => (
                indices::landsat(&geometry, &window, clouds),
                Some(indices::LANDSAT_CLOUD_PROPERTY),
            ),
            Sensor::Sentinel1 => (indices::sentinel1_vv(&geometry, &window), None),
            Sensor::Srtm => {
                return Err(SentinelError::invalid(
                    "layer_type",
                    format!("Tipo de camada '{}' não suportado para listagem.", query.layer),
                ))
            }
        };

        let newest = collection
            .clone()
            .sort(indices::TIME_START, false)
            .limit(LISTING_LIMIT);
        let mut columns = vec![
            ("times", newest.clone().aggregate_array(indices::TIME_START)),
            ("total", collection.size()),
        ];
        if let Some(property) = cloud_property {
            columns.push(("clouds", newest.clone().aggregate_array(property)));
        }
        if sensor == Sensor::Landsat {
            columns.push(("spacecraft", newest.aggregate_array("SPACECRAFT_ID")));
        }

        tracing::debug!(layer = %query.layer, window = %window, "Listing images");
        let result = self.compute(&Expr::dictionary(columns)).await?;
        let listing = parse_listing(&result, sensor);
        tracing::info!(
            layer = %query.layer,
            listed = listing.images.len(),
            total = listing.total_found,
            "Images listed"
        );
        Ok(listing)
    }

    async fn layer_tile(&self, query: &ImageQuery) -> Result<LayerTile> {
        let window = query.search_window(self.settings.thermal_cutoff);
        let plan = self.plan_tile(query, &window);

        let mut date = window.end_str();
        if let Some(candidates) = &plan.candidates {
            let mut summary = vec![("count", candidates.clone().size())];
            if let Some(scene) = &plan.dated_scene {
                summary.push(("time", scene.clone().property(indices::TIME_START)));
            }
            let result = self.compute(&Expr::dictionary(summary)).await?;

            if result.get("count").and_then(Value::as_u64).unwrap_or(0) == 0 {
                return Err(no_imagery(query.layer, &window, self.settings.thermal_cutoff));
            }
            if let Some(scene_date) = result
                .get("time")
                .and_then(Value::as_f64)
                .and_then(epoch_millis_to_date)
            {
                date = scene_date;
            }
        }

        let tile_url = self.tile_url(&plan.vis.apply(plan.image)).await?;
        tracing::info!(layer = %query.layer, date = %date, "Tile generated");

        Ok(LayerTile {
            date,
            layer_type: query.layer,
            tile_url,
        })
    }

    async fn index_stats(&self, polygon: &Polygon, dates: &DateRange) -> Result<IndexStats> {
        let geometry = Expr::polygon(polygon);
        let s2 = indices::sentinel2(&geometry, dates, Some(indices::ANALYSIS_MAX_CLOUD));
        let l8 = indices::landsat8(&geometry, dates, Some(indices::ANALYSIS_MAX_CLOUD));

        let counts = self
            .compute(&Expr::dictionary([("s2", s2.clone().size()), ("l8", l8.clone().size())]))
            .await?;

        let mean = || Expr::reducer("Reducer.mean");
        let mut entries = Vec::new();
        if counts.get("s2").and_then(Value::as_u64).unwrap_or(0) > 0 {
            let composite = s2.median().clip(geometry.clone());
            entries.push((
                "ndvi",
                indices::ndvi(composite.clone()).reduce_region(
                    mean(),
                    geometry.clone(),
                    indices::LANDSAT_SCALE_M,
                ),
            ));
            entries.push((
                "ndwi",
                indices::ndwi(composite).reduce_region(
                    mean(),
                    geometry.clone(),
                    indices::LANDSAT_SCALE_M,
                ),
            ));
        }
        if counts.get("l8").and_then(Value::as_u64).unwrap_or(0) > 0 {
            let composite = l8.median().clip(geometry.clone());
            entries.push((
                "lst",
                indices::lst_celsius(composite).reduce_region(
                    mean(),
                    geometry,
                    indices::LANDSAT_SCALE_M,
                ),
            ));
        }

        if entries.is_empty() {
            return Ok(IndexStats::default());
        }

        let result = self.compute(&Expr::dictionary(entries)).await?;
        Ok(IndexStats {
            ndvi_mean: stat(&result, "/ndvi/NDVI"),
            ndwi_mean: stat(&result, "/ndwi/NDWI"),
            lst_mean_celsius: stat(&result, "/lst/LST"),
        })
    }

    async fn elevation(&self, polygon: &Polygon) -> Result<ElevationSummary> {
        let geometry = Expr::polygon(polygon);
        let dem = Expr::image(indices::SRTM).select(&["elevation"]).clip(geometry.clone());

        let stats = self
            .compute(&dem.clone().reduce_region(
                Expr::reducer("Reducer.minMax"),
                geometry,
                indices::LANDSAT_SCALE_M,
            ))
            .await?;
        let min_elevation = stat(&stats, "/elevation_min");
        let max_elevation = stat(&stats, "/elevation_max");

        let tile_url = self
            .tile_url(&VisParams::elevation(min_elevation, max_elevation).apply(dem))
            .await?;

        Ok(ElevationSummary {
            tile_url,
            min_elevation,
            max_elevation,
        })
    }

    async fn layer_statistics(
        &self,
        polygon: &Polygon,
        layer: LayerType,
        dates: &DateRange,
    ) -> Result<LayerStatistics> {
        let geometry = Expr::polygon(polygon);

        let (candidates, image, scale) = match layer {
            LayerType::Lst => {
                let window = self.thermal_window(dates);
                let candidates = indices::landsat(&geometry, &window, None);
                let scene = candidates.clone().sort(indices::LANDSAT_CLOUD_PROPERTY, true).first();
                (candidates, indices::lst_celsius(scene), indices::LANDSAT_SCALE_M)
            }
            LayerType::Ndvi | LayerType::Ndwi => {
                let candidates = indices::sentinel2(&geometry, dates, None);
                let scene = candidates.clone().sort(indices::S2_CLOUD_PROPERTY, true).first();
                let image = if layer == LayerType::Ndvi {
                    indices::ndvi(scene)
                } else {
                    indices::ndwi(scene)
                };
                (candidates, image, indices::SENTINEL_SCALE_M)
            }
            other => {
                return Err(SentinelError::invalid(
                    "layer_type",
                    format!("Estatísticas não disponíveis para a camada {}", other),
                ))
            }
        };

        if self.count(&candidates).await? == 0 {
            return Err(no_imagery(layer, dates, self.settings.thermal_cutoff));
        }

        let band = layer.value_band().unwrap_or(layer.as_str());
        let stats = self
            .compute(&image.reduce_region(indices::summary_reducer(), geometry, scale))
            .await?;
        let key = |suffix: &str| format!("/{}_{}", band, suffix);

        Ok(LayerStatistics {
            layer_type: layer,
            unit: layer.unit().to_string(),
            mean: stat(&stats, &key("mean")),
            min: stat(&stats, &key("min")),
            max: stat(&stats, &key("max")),
            std_dev: stat(&stats, &key("stdDev")),
        })
    }

    async fn sar_backscatter(&self, polygon: &Polygon, dates: &DateRange) -> Result<SarSummary> {
        let geometry = Expr::polygon(polygon);
        let collection = indices::sentinel1_vv(&geometry, dates);

        let images_used = self.count(&collection).await?;
        if images_used == 0 {
            return Err(no_imagery(LayerType::Sar, dates, None));
        }

        let stats = self
            .compute(&collection.median().select(&["VV"]).reduce_region(
                indices::summary_reducer(),
                geometry,
                indices::SENTINEL_SCALE_M,
            ))
            .await?;

        Ok(SarSummary {
            polarization: "VV".to_string(),
            images_used,
            mean_backscatter: required(&stats, "/VV_mean", "VV_mean")?,
            min_backscatter: stat(&stats, "/VV_min"),
            max_backscatter: stat(&stats, "/VV_max"),
            std_dev: stat(&stats, "/VV_stdDev"),
        })
    }

    async fn heat_island(&self, polygon: &Polygon, dates: &DateRange) -> Result<HeatIslandSummary> {
        let geometry = Expr::polygon(polygon);
        let window = self.thermal_window(dates);
        let candidates = indices::landsat(&geometry, &window, None);

        if self.count(&candidates).await? == 0 {
            return Err(no_imagery(LayerType::Lst, &window, self.settings.thermal_cutoff));
        }

        let scene = candidates.sort(indices::LANDSAT_CLOUD_PROPERTY, true).first();
        let lst = indices::lst_celsius(scene);
        let ring = geometry.clone().buffer(indices::RURAL_RING_M).difference(geometry.clone());
        let mean_over = |region: Expr| {
            lst.clone()
                .reduce_region(Expr::reducer("Reducer.mean"), region, indices::LANDSAT_SCALE_M)
        };

        let result = self
            .compute(&Expr::dictionary([
                ("urban", mean_over(geometry)),
                ("rural", mean_over(ring)),
            ]))
            .await?;

        Ok(HeatIslandSummary {
            urban_temperature: required(&result, "/urban/LST", "urban_temperature")?,
            rural_temperature: required(&result, "/rural/LST", "rural_temperature")?,
        })
    }

    async fn water_bodies(&self, polygon: &Polygon, dates: &DateRange) -> Result<WaterSummary> {
        let geometry = Expr::polygon(polygon);
        let candidates = indices::sentinel2(&geometry, dates, None);

        if self.count(&candidates).await? == 0 {
            return Err(no_imagery(LayerType::Ndwi, dates, None));
        }

        let scene = candidates.sort(indices::S2_CLOUD_PROPERTY, true).first();
        let ndwi = indices::ndwi(scene);
        let water_area = ndwi
            .clone()
            .gt(indices::number(WATER_NDWI_THRESHOLD))
            .multiply(Expr::pixel_area())
            .reduce_region(
                Expr::reducer("Reducer.sum"),
                geometry.clone(),
                indices::SENTINEL_SCALE_M,
            );
        let ndwi_stats = ndwi.reduce_region(
            Expr::reducer("Reducer.mean").combine(Expr::reducer("Reducer.minMax")),
            geometry.clone(),
            indices::SENTINEL_SCALE_M,
        );

        let result = self
            .compute(&Expr::dictionary([
                ("area", geometry.area()),
                ("water", water_area),
                ("stats", ndwi_stats),
            ]))
            .await?;

        Ok(WaterSummary {
            total_area_ha: stat(&result, "/area").unwrap_or(0.0) / SQUARE_METERS_PER_HECTARE,
            water_area_ha: stat(&result, "/water/NDWI").unwrap_or(0.0) / SQUARE_METERS_PER_HECTARE,
            ndwi_mean: stat(&result, "/stats/NDWI_mean"),
            ndwi_min: stat(&result, "/stats/NDWI_min"),
            ndwi_max: stat(&result, "/stats/NDWI_max"),
        })
    }

    async fn area_measurements(
        &self,
        polygon: &Polygon,
        dates: &DateRange,
    ) -> Result<AreaMeasurements> {
        let geometry = Expr::polygon(polygon);
        let window = self.thermal_window(dates);
        let landsat = indices::landsat(&geometry, &window, None);
        let s2 = indices::sentinel2(&geometry, dates, Some(indices::ANALYSIS_MAX_CLOUD));

        let counts = self
            .compute(&Expr::dictionary([
                ("landsat", landsat.clone().size()),
                ("s2", s2.clone().size()),
            ]))
            .await?;

        let mean = || Expr::reducer("Reducer.mean");

        // Per-scene mean temperature, then the number of scenes above the extreme-heat line
        let scene_mean = indices::lst_celsius(Expr::argument("scene"))
            .reduce_region(mean(), geometry.clone(), indices::LANDSAT_SCALE_M)
            .get_or("LST", -999.0);
        let tagged = landsat.clone().map(Expr::function(
            vec!["scene"],
            Expr::argument("scene").set("lst_mean", scene_mean),
        ));
        let heat_days = tagged.filter(Expr::filter_gt("lst_mean", indices::EXTREME_HEAT_C)).size();

        let elevation = Expr::image(indices::SRTM)
            .select(&["elevation"])
            .reduce_region(mean(), geometry.clone(), indices::LANDSAT_SCALE_M);

        let mut entries = vec![("heat_days", heat_days), ("elevation", elevation)];
        if counts.get("landsat").and_then(Value::as_u64).unwrap_or(0) > 0 {
            let composite = indices::thermal_composite(landsat, false);
            entries.push((
                "lst",
                indices::lst_celsius(composite).reduce_region(
                    mean(),
                    geometry.clone(),
                    indices::LANDSAT_SCALE_M,
                ),
            ));
        }
        if counts.get("s2").and_then(Value::as_u64).unwrap_or(0) > 0 {
            let composite = s2.median().clip(geometry.clone());
            entries.push((
                "ndvi",
                indices::ndvi(composite.clone()).reduce_region(
                    mean(),
                    geometry.clone(),
                    indices::LANDSAT_SCALE_M,
                ),
            ));
            entries.push((
                "ndwi",
                indices::ndwi(composite).reduce_region(mean(), geometry, indices::LANDSAT_SCALE_M),
            ));
        }

        let result = self.compute(&Expr::dictionary(entries)).await?;
        let measurements = AreaMeasurements {
            avg_temp_c: stat(&result, "/lst/LST"),
            extreme_heat_days: result.get("heat_days").and_then(Value::as_u64).map(|d| d as u32),
            ndvi_mean: stat(&result, "/ndvi/NDVI"),
            ndwi_mean: stat(&result, "/ndwi/NDWI"),
            elevation_m: stat(&result, "/elevation/elevation"),
        };
        tracing::debug!(?measurements, "Area measurements computed");
        Ok(measurements)
    }

    async fn ping(&self) -> Result<()> {
        self.compute(&Expr::constant(1)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_landsat_listing() {
        let result = json!({
            "times": [1_704_844_800_000_i64, 1_704_067_200_000_i64],
            "clouds": [12.3456, 3.0],
            "spacecraft": ["LANDSAT_9", "LANDSAT_8"],
            "total": 7
        });
        let listing = parse_listing(&result, Sensor::Landsat);

        assert_eq!(listing.total_found, 7);
        assert_eq!(listing.images.len(), 2);
        assert_eq!(listing.images[0].date, "2024-01-10");
        assert_eq!(listing.images[0].cloud_cover, 12.35);
        assert_eq!(listing.images[0].satellite, "Landsat 9");
        assert_eq!(listing.images[1].satellite, "Landsat 8");
        assert_eq!(listing.best().unwrap().date, "2024-01-01");
    }

    #[test]
    fn test_parse_sentinel1_listing_has_no_clouds() {
        let result = json!({"times": [1_704_067_200_000_i64], "total": 1});
        let listing = parse_listing(&result, Sensor::Sentinel1);
        assert_eq!(listing.images[0].cloud_cover, 0.0);
        assert_eq!(listing.images[0].satellite, "Sentinel-1");
    }

    #[test]
    fn test_parse_empty_listing() {
        let listing = parse_listing(&json!({"times": [], "total": 0}), Sensor::Sentinel2);
        assert!(listing.images.is_empty());
        assert_eq!(listing.total_found, 0);
    }

    #[test]
    fn test_failure_extracts_message() {
        let body = r#"{"error": {"code": 400, "message": "Image.select: Pattern 'ST_B10' did not match any bands.", "status": "INVALID_ARGUMENT"}}"#;
        match failure(reqwest::StatusCode::BAD_REQUEST, body) {
            SentinelError::EarthEngine { reason } => {
                assert_eq!(
                    reason,
                    "HTTP 400: Image.select: Pattern 'ST_B10' did not match any bands."
                )
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_failure_maps_auth_status() {
        assert!(matches!(
            failure(reqwest::StatusCode::FORBIDDEN, "denied"),
            SentinelError::Auth { .. }
        ));
    }

    #[test]
    fn test_no_imagery_hint_mentions_cutoff_for_landsat_only() {
        let window = DateRange::parse("2025-01-01", "2025-02-01").unwrap();
        let cutoff = NaiveDate::from_ymd_opt(2024, 12, 31);

        match no_imagery(LayerType::Lst, &window, cutoff) {
            SentinelError::NoImagery { layer, hint } => {
                assert_eq!(layer, "LST");
                assert!(hint.contains("2024-12-31"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        match no_imagery(LayerType::Ndvi, &window, cutoff) {
            SentinelError::NoImagery { hint, .. } => assert!(!hint.contains("2024-12-31")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_epoch_millis_match_calendar_date(days in 0i64..40_000, offset_ms in 0i64..86_400_000) {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days);
            let millis = days * 86_400_000 + offset_ms;
            prop_assert_eq!(epoch_millis_to_date(millis as f64), Some(date.format(DATE_FORMAT).to_string()));
        }
    }
}
