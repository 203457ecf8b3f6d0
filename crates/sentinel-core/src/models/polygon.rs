use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};

/// Minimum number of distinct vertices for an area of interest
pub const MIN_VERTICES: usize = 3;

/// A WGS 84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a GeoJSON-ordered `[lng, lat]` pair
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lng: pair[0],
        }
    }

    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A polygon vertex as sent by clients.
///
/// The map frontend posts `{lat, lng}` objects while the area-risk endpoint
/// posts GeoJSON-style `[lng, lat]` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vertex {
    LatLng(Coordinate),
    LngLat([f64; 2]),
}

impl From<Vertex> for Coordinate {
    fn from(vertex: Vertex) -> Self {
        match vertex {
            Vertex::LatLng(c) => c,
            Vertex::LngLat(pair) => Coordinate::from_lng_lat(pair),
        }
    }
}

/// Area of interest: an implicitly closed ring of at least three vertices.
///
/// A trailing vertex equal to the first one is dropped on construction, so
/// `vertices()` never repeats the start point and `ring()` always closes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Polygon {
    vertices: Vec<Coordinate>,
}

impl Polygon {
    pub fn new(mut vertices: Vec<Coordinate>) -> Result<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        if vertices.len() < MIN_VERTICES {
            return Err(SentinelError::InvalidPolygon {
                reason: format!(
                    "at least {} points are required, got {}",
                    MIN_VERTICES,
                    vertices.len()
                ),
            });
        }

        if let Some(bad) = vertices.iter().find(|c| !c.is_valid()) {
            return Err(SentinelError::InvalidPolygon {
                reason: format!("coordinate out of range: lat={}, lng={}", bad.lat, bad.lng),
            });
        }

        Ok(Self { vertices })
    }

    /// Build from client vertices in either accepted shape
    pub fn from_vertices(vertices: &[Vertex]) -> Result<Self> {
        Self::new(vertices.iter().copied().map(Coordinate::from).collect())
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Closed exterior ring in `[lng, lat]` order
    pub fn ring(&self) -> Vec<[f64; 2]> {
        let mut ring: Vec<[f64; 2]> = self.vertices.iter().map(|c| c.to_lng_lat()).collect();
        ring.push(self.vertices[0].to_lng_lat());
        ring
    }

    /// Arithmetic mean of the vertices, used as a label point for geocoding
    pub fn center(&self) -> Coordinate {
        let n = self.vertices.len() as f64;
        let lat = self.vertices.iter().map(|c| c.lat).sum::<f64>() / n;
        let lng = self.vertices.iter().map(|c| c.lng).sum::<f64>() / n;
        Coordinate::new(lat, lng)
    }

    /// Bounding box as `[min_lng, min_lat, max_lng, max_lat]`
    pub fn bbox(&self) -> [f64; 4] {
        self.vertices.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[min_lng, min_lat, max_lng, max_lat], c| {
                [min_lng.min(c.lng), min_lat.min(c.lat), max_lng.max(c.lng), max_lat.max(c.lat)]
            },
        )
    }
}

impl<'de> Deserialize<'de> for Polygon {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let vertices = Vec::<Vertex>::deserialize(deserializer)?;
        Polygon::from_vertices(&vertices).map_err(serde::de::Error::custom)
    }
}
