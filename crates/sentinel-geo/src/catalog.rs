//! GeoJSON datasets served from the data directory

use std::fs;
use std::path::{Path, PathBuf};

use geojson::GeoJson;
use serde::Serialize;
use serde_json::{json, Value};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::{Coordinate, Polygon};

use crate::convert::first_outline;

const GEOJSON_EXTENSION: &str = ".geojson";
const JSON_EXTENSION: &str = ".json";

/// A GeoJSON file loaded for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedDataset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub features_count: usize,
    pub bbox: Option<Vec<f64>>,
    /// Outer ring of the first polygonal feature, for centering the map
    pub polygon: Option<Vec<Coordinate>>,
    pub raw: Value,
}

/// Read-only view over the `*.geojson` files of one directory
#[derive(Debug, Clone)]
pub struct GeoJsonCatalog {
    root: PathBuf,
}

impl GeoJsonCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted names of the `.geojson` files; empty when the directory is missing
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            tracing::debug!(root = %self.root.display(), "Data directory not found");
            return Ok(Vec::new());
        }

        let mut files: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(GEOJSON_EXTENSION))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load a `.geojson` file with its feature count, bbox and first outline
    pub fn load(&self, name: &str) -> Result<LoadedDataset> {
        if !name.to_lowercase().ends_with(GEOJSON_EXTENSION) {
            return Err(SentinelError::invalid("name", "Informe um arquivo .geojson"));
        }

        let (file_name, raw) = self.read(name)?;
        let geojson = parse(&file_name, raw.clone())?;

        let (kind, features_count, geometry) = match &geojson {
            GeoJson::FeatureCollection(fc) => (
                "FeatureCollection".to_string(),
                fc.features.len(),
                fc.features.first().and_then(|f| f.geometry.as_ref()),
            ),
            GeoJson::Feature(f) => ("Feature".to_string(), 1, f.geometry.as_ref()),
            GeoJson::Geometry(g) => (geometry_type(&g.value).to_string(), 0, Some(g)),
        };

        let bbox = raw
            .get("bbox")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_f64).collect());

        Ok(LoadedDataset {
            name: file_name,
            kind,
            features_count,
            bbox,
            polygon: geometry.and_then(|g| first_outline(&g.value)),
            raw,
        })
    }

    /// Load a feature collection, keeping only features with a coordinate inside
    /// the area's bounding box, and tag every returned feature with `source_file`
    pub fn render_layer(&self, filename: &str, area: Option<&Polygon>) -> Result<Value> {
        let lower = filename.to_lowercase();
        if !lower.ends_with(GEOJSON_EXTENSION) && !lower.ends_with(JSON_EXTENSION) {
            return Err(SentinelError::invalid("filename", "Informe um arquivo .geojson ou .json"));
        }

        let (file_name, raw) = self.read(filename)?;
        parse(&file_name, raw.clone())?;

        let features = raw.get("features").and_then(Value::as_array).cloned().unwrap_or_default();
        let total = features.len();

        let mut kept: Vec<Value> = match area {
            Some(area) => {
                let bbox = area.bbox();
                features
                    .into_iter()
                    .filter(|feature| {
                        feature
                            .get("geometry")
                            .and_then(|g| g.get("coordinates"))
                            .map(|coords| any_position_in(coords, &bbox))
                            .unwrap_or(false)
                    })
                    .collect()
            }
            None => features,
        };

        for feature in kept.iter_mut() {
            if let Some(object) = feature.as_object_mut() {
                object.insert("source_file".to_string(), Value::String(file_name.clone()));
            }
        }

        tracing::debug!(file = %file_name, total, kept = kept.len(), "Rendered GeoJSON layer");

        Ok(json!({
            "type": "FeatureCollection",
            "features": kept,
        }))
    }

    /// Resolve a client-supplied name to a file directly inside the root
    fn resolve(&self, name: &str) -> Result<(String, PathBuf)> {
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| *n != "." && *n != "..")
            .ok_or_else(|| SentinelError::invalid("name", "Caminho inválido"))?;

        Ok((base.to_string(), self.root.join(base)))
    }

    fn read(&self, name: &str) -> Result<(String, Value)> {
        let (file_name, path) = self.resolve(name)?;
        if !path.is_file() {
            return Err(SentinelError::DatasetNotFound { name: file_name });
        }

        let content = fs::read_to_string(&path)?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| SentinelError::InvalidDataset {
            name: file_name.clone(),
            reason: format!("Failed to parse JSON: {}", e),
        })?;
        Ok((file_name, raw))
    }
}

fn parse(name: &str, raw: Value) -> Result<GeoJson> {
    GeoJson::from_json_value(raw).map_err(|e| SentinelError::InvalidDataset {
        name: name.to_string(),
        reason: format!("Invalid GeoJSON: {}", e),
    })
}

fn geometry_type(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Whether any `[lng, lat]` position nested in `coords` falls inside `bbox`
fn any_position_in(coords: &Value, bbox: &[f64; 4]) -> bool {
    let [min_lng, min_lat, max_lng, max_lat] = *bbox;
    match coords.as_array() {
        Some(items) => {
            let lng = items.first().and_then(Value::as_f64);
            let lat = items.get(1).and_then(Value::as_f64);
            match (lng, lat) {
                (Some(lng), Some(lat)) => {
                    (min_lng..=max_lng).contains(&lng) && (min_lat..=max_lat).contains(&lat)
                }
                _ => items.iter().any(|item| any_position_in(item, bbox)),
            }
        }
        None => false,
    }
}
