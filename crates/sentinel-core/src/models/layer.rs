use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// Image layers the map can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    Sentinel2Rgb,
    LandsatRgb,
    Sentinel1Vv,
    Ndvi,
    Ndwi,
    Lst,
    Uhi,
    Utfvi,
    Dem,
    Sar,
}

/// Source instrument behind a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    Sentinel2,
    Landsat,
    Sentinel1,
    Srtm,
}

impl Sensor {
    /// Display name used in listings and analysis metadata
    pub fn display_name(&self) -> &'static str {
        match self {
            Sensor::Sentinel2 => "Sentinel-2",
            Sensor::Landsat => "Landsat 8/9",
            Sensor::Sentinel1 => "Sentinel-1",
            Sensor::Srtm => "SRTM",
        }
    }
}

impl LayerType {
    pub const ALL: [LayerType; 10] = [
        LayerType::Sentinel2Rgb,
        LayerType::LandsatRgb,
        LayerType::Sentinel1Vv,
        LayerType::Ndvi,
        LayerType::Ndwi,
        LayerType::Lst,
        LayerType::Uhi,
        LayerType::Utfvi,
        LayerType::Dem,
        LayerType::Sar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Sentinel2Rgb => "SENTINEL2_RGB",
            LayerType::LandsatRgb => "LANDSAT_RGB",
            LayerType::Sentinel1Vv => "SENTINEL1_VV",
            LayerType::Ndvi => "NDVI",
            LayerType::Ndwi => "NDWI",
            LayerType::Lst => "LST",
            LayerType::Uhi => "UHI",
            LayerType::Utfvi => "UTFVI",
            LayerType::Dem => "DEM",
            LayerType::Sar => "SAR",
        }
    }

    pub fn sensor(&self) -> Sensor {
        match self {
            LayerType::Sentinel2Rgb | LayerType::Ndvi | LayerType::Ndwi => Sensor::Sentinel2,
            LayerType::LandsatRgb | LayerType::Lst | LayerType::Uhi | LayerType::Utfvi => {
                Sensor::Landsat
            }
            LayerType::Sentinel1Vv | LayerType::Sar => Sensor::Sentinel1,
            LayerType::Dem => Sensor::Srtm,
        }
    }

    /// Layers derived from the Landsat surface temperature band
    pub fn is_thermal(&self) -> bool {
        matches!(self, LayerType::Lst | LayerType::Uhi | LayerType::Utfvi)
    }

    /// Whether searches for this layer are capped at the thermal archive cutoff
    pub fn uses_cutoff(&self) -> bool {
        self.sensor() == Sensor::Landsat
    }

    /// Unit suffix used when rendering a mean value of this layer
    pub fn unit(&self) -> &'static str {
        match self {
            LayerType::Lst => "°C",
            LayerType::Sentinel1Vv | LayerType::Sar => " dB",
            LayerType::Dem => " m",
            _ => "",
        }
    }

    /// Band name holding the layer value after index computation
    pub fn value_band(&self) -> Option<&'static str> {
        match self {
            LayerType::Ndvi => Some("NDVI"),
            LayerType::Ndwi => Some("NDWI"),
            LayerType::Lst => Some("LST"),
            LayerType::Uhi => Some("UHI"),
            LayerType::Utfvi => Some("UTFVI"),
            LayerType::Sentinel1Vv | LayerType::Sar => Some("VV"),
            LayerType::Dem => Some("elevation"),
            LayerType::Sentinel2Rgb | LayerType::LandsatRgb => None,
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        LayerType::ALL
            .iter()
            .copied()
            .find(|layer| layer.as_str() == normalized)
            .ok_or_else(|| {
                SentinelError::invalid("layer_type", format!("unsupported layer type '{}'", s))
            })
    }
}
