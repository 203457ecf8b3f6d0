//! Property summaries over GeoJSON features

use std::collections::BTreeMap;

use geo::algorithm::intersects::Intersects;
use serde_json::Value;
use sentinel_core::models::{FeatureSummary, Polygon, PropertySummary};

use crate::convert::to_geo_polygon;

/// Maximum number of distinct values sampled for a categorical property
pub const SAMPLE_LIMIT: usize = 10;

/// Summarize the properties of a feature collection.
///
/// With an area, only features whose geometry intersects it are counted;
/// features with missing or unsupported geometry are then skipped. Property
/// keys come from the first kept feature. A key is numeric when its first
/// non-null value is a number, categorical otherwise.
pub fn summarize_features(geojson: &Value, area: Option<&Polygon>) -> FeatureSummary {
    let features: Vec<&Value> = geojson
        .get("features")
        .and_then(Value::as_array)
        .map(|features| features.iter().collect())
        .unwrap_or_default();

    let features: Vec<&Value> = match area {
        Some(area) => {
            let area = to_geo_polygon(area);
            features.into_iter().filter(|f| intersects_area(f, &area)).collect()
        }
        None => features,
    };

    let mut properties_summary = BTreeMap::new();
    let keys: Vec<&String> = features
        .first()
        .and_then(|f| f.get("properties"))
        .and_then(Value::as_object)
        .map(|props| props.keys().collect())
        .unwrap_or_default();

    for key in keys {
        let values: Vec<&Value> = features
            .iter()
            .filter_map(|f| f.get("properties").and_then(|p| p.get(key.as_str())))
            .filter(|v| !v.is_null())
            .collect();

        if let Some(summary) = summarize_values(&values) {
            properties_summary.insert(key.clone(), summary);
        }
    }

    FeatureSummary {
        total_features: features.len(),
        properties_summary,
    }
}

fn intersects_area(feature: &Value, area: &geo::Polygon<f64>) -> bool {
    let geometry = match feature.get("geometry").cloned().map(geojson::Geometry::from_json_value) {
        Some(Ok(geometry)) => geometry,
        _ => return false,
    };

    match geo::Geometry::<f64>::try_from(geometry.value) {
        Ok(geometry) => geometry.intersects(area),
        Err(_) => false,
    }
}

fn summarize_values(values: &[&Value]) -> Option<PropertySummary> {
    let first = values.first()?;

    if first.is_number() {
        let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
        if numbers.is_empty() {
            return None;
        }
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = numbers.iter().sum::<f64>() / numbers.len() as f64;
        return Some(PropertySummary::Numeric { min, max, avg });
    }

    let mut unique: Vec<String> = Vec::new();
    for value in values {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !unique.contains(&text) {
            unique.push(text);
        }
    }

    let unique_count = unique.len();
    unique.truncate(SAMPLE_LIMIT);
    Some(PropertySummary::Categorical {
        unique_count,
        sample_values: unique,
    })
}
