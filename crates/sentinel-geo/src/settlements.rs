//! R-tree index over settlement polygons
//!
//! Settlements (favelas and informal communities) are loaded once from a
//! GeoJSON file and queried per request: an envelope lookup narrows the
//! candidates, then an exact intersection test decides the count.

use std::fs;
use std::path::Path;

use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::intersects::Intersects;
use geo::Geometry as GeoGeometry;
use geojson::GeoJson;
use rstar::{RTree, RTreeObject, AABB};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::models::Polygon;

use crate::convert::{to_geo_geometry, to_geo_polygon};

/// One settlement geometry with its cached envelope
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSettlement {
    /// Position of the feature in the source collection
    pub id: usize,

    pub geometry: GeoGeometry<f64>,

    envelope: AABB<[f64; 2]>,
}

impl IndexedSettlement {
    /// Returns `None` for empty geometries, which cannot intersect anything
    fn new(id: usize, geometry: GeoGeometry<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        Some(Self {
            id,
            geometry,
            envelope,
        })
    }
}

impl RTreeObject for IndexedSettlement {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index for settlement intersection counts
#[derive(Debug, Default)]
pub struct SettlementIndex {
    tree: RTree<IndexedSettlement>,
}

impl SettlementIndex {
    /// Create an index from `(id, geometry)` pairs, skipping empty geometries
    pub fn from_geometries(geometries: Vec<(usize, GeoGeometry<f64>)>) -> Self {
        let indexed: Vec<IndexedSettlement> = geometries
            .into_iter()
            .filter_map(|(id, geometry)| IndexedSettlement::new(id, geometry))
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Build an index from a parsed GeoJSON document.
    ///
    /// Features without geometry or with geometry types `geo` cannot represent
    /// are skipped with a warning.
    pub fn from_geojson(geojson: &GeoJson) -> Self {
        let geometries: Vec<&geojson::Geometry> = match geojson {
            GeoJson::FeatureCollection(fc) => {
                fc.features.iter().filter_map(|f| f.geometry.as_ref()).collect()
            }
            GeoJson::Feature(f) => f.geometry.iter().collect(),
            GeoJson::Geometry(g) => vec![g],
        };

        let converted = geometries
            .into_iter()
            .enumerate()
            .filter_map(|(id, geometry)| match to_geo_geometry(geometry) {
                Ok(g) => Some((id, g)),
                Err(e) => {
                    tracing::warn!(feature = id, error = %e, "Skipping settlement feature");
                    None
                }
            })
            .collect();

        Self::from_geometries(converted)
    }

    /// Load settlements from a GeoJSON file
    pub fn load(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        if !path.exists() {
            return Err(SentinelError::DatasetNotFound { name });
        }

        let content = fs::read_to_string(path)?;
        let geojson: GeoJson = content.parse().map_err(|e| SentinelError::InvalidDataset {
            name: name.clone(),
            reason: format!("Failed to parse GeoJSON: {}", e),
        })?;

        let index = Self::from_geojson(&geojson);
        tracing::info!(path = %name, settlements = index.len(), "Settlement index loaded");
        Ok(index)
    }

    /// Number of settlements whose geometry intersects the area
    pub fn count_intersecting(&self, area: &Polygon) -> usize {
        let [min_lng, min_lat, max_lng, max_lat] = area.bbox();
        let query = AABB::from_corners([min_lng, min_lat], [max_lng, max_lat]);
        let area = to_geo_polygon(area);

        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|settlement| settlement.geometry.intersects(&area))
            .count()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};
    use proptest::prelude::*;
    use sentinel_core::models::Coordinate;

    fn square_settlement(x: f64, y: f64, size: f64) -> GeoGeometry<f64> {
        GeoGeometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ])
    }

    fn grid_index() -> SettlementIndex {
        let mut geometries = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let id = i * 5 + j;
                geometries.push((id, square_settlement(i as f64 * 2.0, j as f64 * 2.0, 1.0)));
            }
        }
        SettlementIndex::from_geometries(geometries)
    }

    fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Coordinate> {
        vec![
            Coordinate::new(y0, x0),
            Coordinate::new(y0, x1),
            Coordinate::new(y1, x1),
            Coordinate::new(y1, x0),
        ]
    }

    #[test]
    fn test_count_intersecting() {
        let index = grid_index();
        assert_eq!(index.len(), 25);

        // Covers the settlements at (0,0), (2,0), (0,2), (2,2)
        let area = Polygon::new(rectangle(-0.5, -0.5, 2.5, 2.5)).unwrap();
        assert_eq!(index.count_intersecting(&area), 4);

        // Sits in the gap between settlements
        let gap = Polygon::new(rectangle(1.2, 1.2, 1.8, 1.8)).unwrap();
        assert_eq!(index.count_intersecting(&gap), 0);
    }

    #[test]
    fn test_envelope_overlap_is_not_intersection() {
        // L-shaped settlement whose envelope covers the query area but whose shape does not
        let l_shape = GeoGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 3.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 3.0),
            (x: 0.0, y: 3.0),
            (x: 0.0, y: 0.0),
        ]);
        let index = SettlementIndex::from_geometries(vec![(0, l_shape)]);
        let area = Polygon::new(rectangle(2.0, 2.0, 2.5, 2.5)).unwrap();
        assert_eq!(index.count_intersecting(&area), 0);
    }

    #[test]
    fn test_point_settlements_are_counted() {
        let point = GeoGeometry::Point(Point::new(0.5, 0.5));
        let index = SettlementIndex::from_geometries(vec![(0, point)]);
        let area = Polygon::new(rectangle(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(index.count_intersecting(&area), 1);
    }

    #[test]
    fn test_from_geojson_skips_features_without_geometry() {
        let geojson: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"nome": "A"}, "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature", "properties": {"nome": "B"}, "geometry": null}
            ]
        }"#
        .parse()
        .unwrap();
        let index = SettlementIndex::from_geojson(&geojson);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SettlementIndex::load(Path::new("/nonexistent/favelas.geojson")).unwrap_err();
        assert!(matches!(err, SentinelError::DatasetNotFound { .. }));
    }

    proptest! {
        #[test]
        fn prop_count_invariant_under_rotation_and_winding(
            x0 in -1.0f64..9.0,
            y0 in -1.0f64..9.0,
            w in 0.1f64..6.0,
            h in 0.1f64..6.0,
            shift in 0usize..4,
            reverse in any::<bool>(),
        ) {
            let index = grid_index();
            let base = rectangle(x0, y0, x0 + w, y0 + h);
            let expected = index.count_intersecting(&Polygon::new(base.clone()).unwrap());

            let mut vertices = base;
            vertices.rotate_left(shift);
            if reverse {
                vertices.reverse();
            }
            let permuted = Polygon::new(vertices).unwrap();
            prop_assert_eq!(index.count_intersecting(&permuted), expected);
        }
    }
}
