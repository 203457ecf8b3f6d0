use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::imagery::{parse_date, DateRange};
use crate::models::polygon::{Polygon, Vertex};

/// Most turns kept in a session history
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Partial context sent by the map client alongside a chat message.
///
/// Absent fields leave the stored value untouched; layer and metadata maps
/// are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextUpdate {
    #[serde(default)]
    pub polygon: Option<Vec<Vertex>>,
    #[serde(default)]
    pub satellite_layers: Option<Map<String, Value>>,
    #[serde(default)]
    pub geojson_data: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// What the assistant knows about one user session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatContext {
    pub polygon: Option<Polygon>,
    pub satellite_layers: Map<String, Value>,
    pub geojson: Option<Value>,
    pub analysis_metadata: Map<String, Value>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    history: Vec<ChatTurn>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a client update. Fields are validated before anything is stored.
    pub fn apply(&mut self, update: ContextUpdate) -> Result<()> {
        let polygon = update.polygon.as_deref().map(Polygon::from_vertices).transpose()?;
        let start = update.start_date.as_deref().map(|s| parse_date("start_date", s)).transpose()?;
        let end = update.end_date.as_deref().map(|s| parse_date("end_date", s)).transpose()?;

        if polygon.is_some() {
            self.polygon = polygon;
        }
        if let Some(layers) = update.satellite_layers {
            self.satellite_layers.extend(layers);
        }
        if let Some(geojson) = update.geojson_data {
            self.geojson = Some(geojson);
        }
        if let Some(metadata) = update.metadata {
            self.analysis_metadata.extend(metadata);
        }
        if start.is_some() {
            self.start_date = start;
        }
        if end.is_some() {
            self.end_date = end;
        }
        Ok(())
    }

    /// Loaded period, when both ends are known and ordered
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => DateRange::new(start, end).ok(),
            _ => None,
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Append one user/model exchange, dropping the oldest turns past the limit
    pub fn record_exchange(&mut self, user: impl Into<String>, model: impl Into<String>) {
        self.history.push(ChatTurn::user(user));
        self.history.push(ChatTurn::model(model));
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    fn geojson_features(&self) -> &[Value] {
        self.geojson
            .as_ref()
            .and_then(|g| g.get("features"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Short human-readable description of the loaded data
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(polygon) = &self.polygon {
            parts.push(format!("📍 **Área:** Polígono com {} pontos", polygon.len()));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            parts.push(format!("📅 **Período:** {} a {}", start, end));
        }

        if !self.satellite_layers.is_empty() {
            let layers: Vec<&str> = self.satellite_layers.keys().map(String::as_str).collect();
            parts.push(format!("🛰️ **Camadas:** {}", layers.join(", ")));
        }

        let features = self.geojson_features();
        if !features.is_empty() {
            parts.push(format!("🗺️ **GeoJSON:** {} features", features.len()));
            let keys: Vec<&str> = features[0]
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().take(5).map(String::as_str).collect())
                .unwrap_or_default();
            if !keys.is_empty() {
                parts.push(format!("   Propriedades disponíveis: {}", keys.join(", ")));
            }
        }

        if !self.analysis_metadata.is_empty() {
            parts.push(format!("📊 **Metadados:** {} análises", self.analysis_metadata.len()));
        }

        if parts.is_empty() {
            "ℹ️ Nenhum dado carregado ainda.".to_string()
        } else {
            parts.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SentinelError;
    use serde_json::json;

    fn update(value: Value) -> ContextUpdate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_context_summary() {
        assert_eq!(ChatContext::new().summary(), "ℹ️ Nenhum dado carregado ainda.");
    }

    #[test]
    fn test_apply_merges_fields() {
        let mut ctx = ChatContext::new();
        ctx.apply(update(json!({
            "polygon": [{"lat": -1.45, "lng": -48.5}, {"lat": -1.46, "lng": -48.48}, {"lat": -1.44, "lng": -48.47}],
            "satellite_layers": {"LST": {"date": "2024-07-10"}},
            "start_date": "2024-01-01",
            "end_date": "2024-01-31"
        })))
        .unwrap();
        ctx.apply(update(json!({"satellite_layers": {"NDVI": {}}}))).unwrap();

        assert_eq!(ctx.polygon.as_ref().unwrap().len(), 3);
        assert_eq!(ctx.satellite_layers.len(), 2);
        assert!(ctx.date_range().is_some());

        let summary = ctx.summary();
        assert!(summary.contains("📍 **Área:** Polígono com 3 pontos"));
        assert!(summary.contains("📅 **Período:** 2024-01-01 a 2024-01-31"));
        assert!(summary.contains("🛰️ **Camadas:** LST, NDVI"));
    }

    #[test]
    fn test_invalid_update_leaves_context_untouched() {
        let mut ctx = ChatContext::new();
        let err = ctx
            .apply(update(json!({"start_date": "2024-01-01", "end_date": "31/01/2024"})))
            .unwrap_err();
        assert!(matches!(err, SentinelError::InvalidInput { .. }));
        assert!(ctx.start_date.is_none());
    }

    #[test]
    fn test_geojson_summary_lists_properties() {
        let mut ctx = ChatContext::new();
        ctx.apply(update(json!({
            "geojson_data": {
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"nome": "Vila", "pop": 120}},
                    {"type": "Feature", "geometry": null, "properties": {"nome": "Jurunas", "pop": 900}}
                ]
            }
        })))
        .unwrap();
        let summary = ctx.summary();
        assert!(summary.contains("🗺️ **GeoJSON:** 2 features"));
        assert!(summary.contains("Propriedades disponíveis: nome, pop"));
    }

    #[test]
    fn test_history_is_capped() {
        let mut ctx = ChatContext::new();
        for i in 0..15 {
            ctx.record_exchange(format!("pergunta {}", i), format!("resposta {}", i));
        }
        assert_eq!(ctx.history().len(), HISTORY_LIMIT);
        assert_eq!(ctx.history()[0], ChatTurn::user("pergunta 5"));
        assert_eq!(ctx.history().last().unwrap(), &ChatTurn::model("resposta 14"));
    }
}
