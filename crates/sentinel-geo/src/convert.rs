//! Conversions between request polygons and `geo` geometries

use geo::{ChamberlainDuquetteArea, Geometry as GeoGeometry, LineString, Polygon as GeoPolygon};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::{Coordinate, Polygon};

/// Convert a request polygon into a closed `geo` polygon in `(lng, lat)` axis order
pub fn to_geo_polygon(polygon: &Polygon) -> GeoPolygon<f64> {
    let exterior: LineString<f64> = polygon.ring().into_iter().collect();
    GeoPolygon::new(exterior, vec![])
}

/// Convert the exterior ring of a `geo` polygon back into a request polygon
pub fn from_geo_polygon(polygon: &GeoPolygon<f64>) -> Result<Polygon> {
    let vertices = polygon
        .exterior()
        .coords()
        .map(|c| Coordinate::new(c.y, c.x))
        .collect();
    Polygon::new(vertices)
}

/// Approximate area on the spheroid, in square kilometres
pub fn area_km2(polygon: &Polygon) -> f64 {
    to_geo_polygon(polygon).chamberlain_duquette_unsigned_area() / 1_000_000.0
}

/// Convert a GeoJSON geometry into a `geo` geometry
pub fn to_geo_geometry(geometry: &geojson::Geometry) -> Result<GeoGeometry<f64>> {
    GeoGeometry::<f64>::try_from(geometry.value.clone())
        .map_err(|e| SentinelError::Serialization(format!("Unsupported geometry: {}", e)))
}

/// Outer ring of the first polygonal geometry, as `[lng, lat]` pairs without the closing vertex
pub fn first_outline(value: &geojson::Value) -> Option<Vec<Coordinate>> {
    let ring = match value {
        geojson::Value::Polygon(rings) => rings.first()?,
        geojson::Value::MultiPolygon(polygons) => polygons.first()?.first()?,
        _ => return None,
    };

    let mut coords: Vec<Coordinate> = ring
        .iter()
        .filter(|position| position.len() >= 2)
        .map(|position| Coordinate::new(position[1], position[0]))
        .collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    Some(coords)
}
