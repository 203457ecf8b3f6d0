//! Collections, spectral index formulas and display palettes

use sentinel_core::models::{DateRange, LayerType};
use serde_json::json;

use crate::expr::Expr;

pub const SENTINEL2: &str = "COPERNICUS/S2_SR_HARMONIZED";
pub const LANDSAT8: &str = "LANDSAT/LC08/C02/T1_L2";
pub const LANDSAT9: &str = "LANDSAT/LC09/C02/T1_L2";
pub const SENTINEL1: &str = "COPERNICUS/S1_GRD";
pub const SRTM: &str = "USGS/SRTMGL1_003";

pub const S2_CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";
pub const LANDSAT_CLOUD_PROPERTY: &str = "CLOUD_COVER";
pub const TIME_START: &str = "system:time_start";

/// Collection 2 Level 2 surface temperature scaling, Kelvin
pub const ST_SCALE: f64 = 0.00341802;
pub const ST_OFFSET: f64 = 149.0;
pub const KELVIN_TO_CELSIUS: f64 = 273.15;

/// Collection 2 Level 2 surface reflectance scaling
pub const SR_SCALE: f64 = 0.0000275;
pub const SR_OFFSET: f64 = -0.2;

pub const MAX_PIXELS: f64 = 1e9;
pub const LANDSAT_SCALE_M: f64 = 30.0;
pub const SENTINEL_SCALE_M: f64 = 10.0;

/// Scenes composited for thermal layers
pub const THERMAL_COMPOSITE_SIZE: usize = 3;
/// Cloud cover limit for the composites behind analysis statistics
pub const ANALYSIS_MAX_CLOUD: f64 = 20.0;
/// Surface temperature counted as an extreme-heat acquisition
pub const EXTREME_HEAT_C: f64 = 35.0;
/// Width of the ring compared against the area for heat islands
pub const RURAL_RING_M: f64 = 5000.0;

pub fn number(value: f64) -> Expr {
    Expr::image_constant(Expr::constant(value))
}

fn optical(
    id: &str,
    cloud_property: &str,
    geometry: &Expr,
    range: &DateRange,
    max_cloud: Option<f64>,
) -> Expr {
    let collection = Expr::image_collection(id)
        .filter(Expr::filter_bounds(geometry.clone()))
        .filter(Expr::filter_date(range));
    match max_cloud {
        Some(max) => collection.filter(Expr::filter_lt(cloud_property, max)),
        None => collection,
    }
}

/// Sentinel-2 surface reflectance over an area and window
pub fn sentinel2(geometry: &Expr, range: &DateRange, max_cloud: Option<f64>) -> Expr {
    optical(SENTINEL2, S2_CLOUD_PROPERTY, geometry, range, max_cloud)
}

/// Landsat 8 and 9 Level 2 scenes merged into one collection
pub fn landsat(geometry: &Expr, range: &DateRange, max_cloud: Option<f64>) -> Expr {
    optical(LANDSAT8, LANDSAT_CLOUD_PROPERTY, geometry, range, max_cloud)
        .merge(optical(LANDSAT9, LANDSAT_CLOUD_PROPERTY, geometry, range, max_cloud))
}

/// Landsat 8 scenes only
pub fn landsat8(geometry: &Expr, range: &DateRange, max_cloud: Option<f64>) -> Expr {
    optical(LANDSAT8, LANDSAT_CLOUD_PROPERTY, geometry, range, max_cloud)
}

/// Sentinel-1 GRD interferometric wide swath scenes carrying VV
pub fn sentinel1_vv(geometry: &Expr, range: &DateRange) -> Expr {
    Expr::image_collection(SENTINEL1)
        .filter(Expr::filter_list_contains("transmitterReceiverPolarisation", "VV"))
        .filter(Expr::filter_eq("instrumentMode", "IW"))
        .filter(Expr::filter_bounds(geometry.clone()))
        .filter(Expr::filter_date(range))
}

/// Thermal image from a Landsat collection: the least cloudy scene for an
/// exact date, otherwise the median of the least cloudy few
pub fn thermal_composite(collection: Expr, exact_date: bool) -> Expr {
    let by_cloud = collection.sort(LANDSAT_CLOUD_PROPERTY, true);
    if exact_date {
        by_cloud.first()
    } else {
        by_cloud.limit(THERMAL_COMPOSITE_SIZE).median()
    }
}

/// NDVI = (B8 - B4) / (B8 + B4)
pub fn ndvi(image: Expr) -> Expr {
    image.normalized_difference(["B8", "B4"]).rename(&["NDVI"])
}

/// NDWI = (B3 - B8) / (B3 + B8)
pub fn ndwi(image: Expr) -> Expr {
    image.normalized_difference(["B3", "B8"]).rename(&["NDWI"])
}

/// Land surface temperature in °C from band ST_B10
pub fn lst_celsius(image: Expr) -> Expr {
    image
        .select(&["ST_B10"])
        .multiply(number(ST_SCALE))
        .add(number(ST_OFFSET))
        .subtract(number(KELVIN_TO_CELSIUS))
        .rename(&["LST"])
}

/// Scaled true-color reflectance
pub fn landsat_rgb(image: Expr) -> Expr {
    image
        .select(&["SR_B4", "SR_B3", "SR_B2"])
        .multiply(number(SR_SCALE))
        .add(number(SR_OFFSET))
}

/// UHI = (LST - mean) / std
pub fn uhi(lst: Expr, mean: Expr, std_dev: Expr) -> Expr {
    lst.subtract(Expr::image_constant(mean))
        .divide(Expr::image_constant(std_dev))
        .rename(&["UHI"])
}

/// UTFVI = (LST - mean) / LST
pub fn utfvi(lst: Expr, mean: Expr) -> Expr {
    lst.clone().subtract(Expr::image_constant(mean)).divide(lst).rename(&["UTFVI"])
}

/// Mean, min, max and standard deviation in one pass
pub fn summary_reducer() -> Expr {
    Expr::reducer("Reducer.mean")
        .combine(Expr::reducer("Reducer.minMax"))
        .combine(Expr::reducer("Reducer.stdDev"))
}

/// Display parameters for `Image.visualize`
#[derive(Debug, Clone, PartialEq)]
pub struct VisParams {
    pub bands: Option<&'static [&'static str]>,
    pub min: f64,
    pub max: f64,
    pub palette: &'static [&'static str],
}

const DIVERGING_HEAT: &[&str] =
    &["313695", "74add1", "fed976", "feb24c", "fd8d3c", "fc4e2a", "e31a1c", "b10026"];

pub const DEM_PALETTE: &[&str] = &["blue", "green", "yellow", "red"];
pub const DEM_DEFAULT_MIN: f64 = 0.0;
pub const DEM_DEFAULT_MAX: f64 = 3000.0;

impl VisParams {
    /// Fixed display parameters; `None` for DEM, whose range comes from the data
    pub fn for_layer(layer: LayerType) -> Option<Self> {
        let params = match layer {
            LayerType::Sentinel2Rgb => Self {
                bands: Some(&["B4", "B3", "B2"]),
                min: 0.0,
                max: 3000.0,
                palette: &[],
            },
            LayerType::LandsatRgb => Self {
                bands: Some(&["SR_B4", "SR_B3", "SR_B2"]),
                min: 0.0,
                max: 0.3,
                palette: &[],
            },
            LayerType::Sentinel1Vv | LayerType::Sar => Self {
                bands: Some(&["VV"]),
                min: -25.0,
                max: 0.0,
                palette: &[],
            },
            LayerType::Ndvi => Self {
                bands: None,
                min: 0.0,
                max: 0.8,
                palette: &["white", "lightgreen", "green", "darkgreen"],
            },
            LayerType::Ndwi => Self {
                bands: None,
                min: -1.0,
                max: 1.0,
                palette: &["#b71c1c", "#ffff00", "#00ffff", "#0d47a1"],
            },
            LayerType::Lst => Self {
                bands: None,
                min: 20.0,
                max: 45.0,
                palette: &["blue", "cyan", "green", "yellow", "orange", "red", "darkred"],
            },
            LayerType::Uhi => Self {
                bands: None,
                min: -3.0,
                max: 3.0,
                palette: DIVERGING_HEAT,
            },
            LayerType::Utfvi => Self {
                bands: None,
                min: -0.1,
                max: 0.1,
                palette: DIVERGING_HEAT,
            },
            LayerType::Dem => return None,
        };
        Some(params)
    }

    pub fn elevation(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            bands: None,
            min: min.unwrap_or(DEM_DEFAULT_MIN),
            max: max.unwrap_or(DEM_DEFAULT_MAX),
            palette: DEM_PALETTE,
        }
    }

    /// Wrap `image` in an `Image.visualize` call
    pub fn apply(&self, image: Expr) -> Expr {
        let mut args = std::collections::BTreeMap::new();
        args.insert("image", image);
        args.insert("min", Expr::constant(self.min));
        args.insert("max", Expr::constant(self.max));
        if let Some(bands) = self.bands {
            args.insert("bands", Expr::constant(json!(bands)));
        }
        if !self.palette.is_empty() {
            args.insert("palette", Expr::constant(json!(self.palette)));
        }
        Expr::Call {
            function: "Image.visualize",
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn function_names(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(name)) = map.get("functionName") {
                    out.push(name.clone());
                }
                map.values().for_each(|v| function_names(v, out));
            }
            Value::Array(items) => items.iter().for_each(|v| function_names(v, out)),
            _ => {}
        }
    }

    fn names(expr: &Expr) -> Vec<String> {
        let mut out = Vec::new();
        function_names(&expr.to_expression(), &mut out);
        out
    }

    #[test]
    fn test_every_layer_but_dem_has_fixed_vis_params() {
        for layer in LayerType::ALL {
            assert_eq!(VisParams::for_layer(layer).is_none(), layer == LayerType::Dem);
        }
    }

    #[test]
    fn test_elevation_defaults() {
        let vis = VisParams::elevation(None, Some(120.0));
        assert_eq!(vis.min, DEM_DEFAULT_MIN);
        assert_eq!(vis.max, 120.0);
    }

    #[test]
    fn test_visualize_omits_empty_palette() {
        let vis = VisParams::for_layer(LayerType::Sentinel2Rgb).unwrap();
        let graph = vis.apply(Expr::image(SRTM)).to_expression();
        let args = &graph["values"]["0"]["functionInvocationValue"]["arguments"];
        assert!(args.get("palette").is_none());
        assert_eq!(args["bands"]["constantValue"], json!(["B4", "B3", "B2"]));
    }

    #[test]
    fn test_thermal_composite_shapes() {
        let range = DateRange::parse("2024-01-01", "2024-03-01").unwrap();
        let geometry = Expr::constant(Value::Null);
        let composite = names(&thermal_composite(landsat(&geometry, &range, Some(30.0)), false));
        assert_eq!(composite.first().map(String::as_str), Some("reduce.median"));
        assert!(composite.contains(&"Collection.merge".to_string()));

        let exact = names(&thermal_composite(landsat(&geometry, &range, Some(30.0)), true));
        assert_eq!(exact.first().map(String::as_str), Some("Collection.first"));
    }

    #[test]
    fn test_lst_formula_constants() {
        let graph = lst_celsius(Expr::image(LANDSAT8)).to_expression().to_string();
        assert!(graph.contains("0.00341802"));
        assert!(graph.contains("149.0"));
        assert!(graph.contains("273.15"));
        assert!(graph.contains("ST_B10"));
    }
}
