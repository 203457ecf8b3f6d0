//! Sentinel Geo - Geometry conversions, settlement indexing and GeoJSON datasets
//!
//! This crate handles the local geospatial work: converting request polygons
//! into `geo` geometries, counting settlement polygons that intersect an area,
//! serving GeoJSON files from the data directory and reverse geocoding.

pub mod catalog;
pub mod convert;
pub mod features;
pub mod geocode;
pub mod settlements;

pub use catalog::{GeoJsonCatalog, LoadedDataset};
pub use convert::{area_km2, from_geo_polygon, to_geo_polygon};
pub use features::summarize_features;
pub use geocode::NominatimGeocoder;
pub use settlements::SettlementIndex;
