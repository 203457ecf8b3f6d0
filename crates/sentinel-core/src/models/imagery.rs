use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};
use crate::models::layer::LayerType;
use crate::models::polygon::Polygon;

/// Date format used on the wire and in Earth Engine filters
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Most images returned by a listing
pub const LISTING_LIMIT: usize = 50;

/// Mean VV backscatter below this value (dB) suggests standing water
pub const FLOOD_BACKSCATTER_DB: f64 = -18.0;

/// NDWI above this value counts a pixel as water
pub const WATER_NDWI_THRESHOLD: f64 = 0.3;

/// Years accepted in request dates
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2999;

/// Inclusive calendar date range, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SentinelError::InvalidDateRange {
                reason: format!("start date {} is after end date {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse two ISO 8601 dates
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date("start_date", start)?, parse_date("end_date", end)?)
    }

    /// The `days` days ending at `today`
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        Self {
            start: today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    /// Resolve optional request dates, filling gaps from a trailing window ending today
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
        default_days: u64,
    ) -> Result<Self> {
        let end = match end {
            Some(s) => parse_date("end_date", s)?,
            None => today,
        };
        let start = match start {
            Some(s) => parse_date("start_date", s)?,
            None => Self::last_days(end, default_days).start,
        };
        Self::new(start, end)
    }

    /// A one-day window starting at `date`, for exact-date image lookups
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date.checked_add_days(Days::new(1)).unwrap_or(date),
        }
    }

    /// Cap both ends at `cutoff`
    pub fn clamp_to(&self, cutoff: NaiveDate) -> Self {
        Self {
            start: self.start.min(cutoff),
            end: self.end.min(cutoff),
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} a {}", self.start_str(), self.end_str())
    }
}

/// Parse an ISO 8601 calendar date, reporting the offending field
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        SentinelError::invalid(field, format!("'{}' is not a YYYY-MM-DD date: {}", value, e))
    })?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(SentinelError::InvalidDateRange {
            reason: format!("{} {} is outside {}..={}", field, date, MIN_YEAR, MAX_YEAR),
        });
    }
    Ok(date)
}

/// A request for imagery over an area
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub polygon: Polygon,
    pub dates: DateRange,
    pub layer: LayerType,
    pub cloud_percentage: f64,
    /// When set, only imagery acquired on this day is considered
    pub specific_date: Option<NaiveDate>,
}

impl ImageQuery {
    /// The window actually searched, after exact-date and archive cutoff rules
    pub fn search_window(&self, cutoff: Option<NaiveDate>) -> DateRange {
        let window = match self.specific_date {
            Some(date) => DateRange::single_day(date),
            None => self.dates,
        };
        match cutoff {
            Some(cutoff) if self.layer.uses_cutoff() => window.clamp_to(cutoff),
            _ => window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub date: String,
    pub cloud_cover: f64,
    pub satellite: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageListing {
    pub images: Vec<ImageSummary>,
    pub total_found: u64,
}

impl ImageListing {
    /// The least cloudy image, earliest in the listing on ties
    pub fn best(&self) -> Option<&ImageSummary> {
        self.images.iter().reduce(|best, candidate| {
            if candidate.cloud_cover < best.cloud_cover {
                candidate
            } else {
                best
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTile {
    pub date: String,
    pub layer_type: LayerType,
    pub tile_url: String,
}

/// Mean index values over an area; `None` when no pixel was valid
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub ndvi_mean: Option<f64>,
    pub ndwi_mean: Option<f64>,
    pub lst_mean_celsius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSummary {
    pub tile_url: String,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
}

/// Region statistics for one layer's best image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStatistics {
    pub layer_type: LayerType,
    pub unit: String,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Sentinel-1 backscatter over an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarSummary {
    pub polarization: String,
    pub images_used: u64,
    pub mean_backscatter: f64,
    pub min_backscatter: Option<f64>,
    pub max_backscatter: Option<f64>,
    pub std_dev: Option<f64>,
}

impl SarSummary {
    pub fn flood_indicator(&self) -> bool {
        self.mean_backscatter < FLOOD_BACKSCATTER_DB
    }

    pub fn interpretation(&self) -> &'static str {
        if self.flood_indicator() {
            "Possível área inundada ou com muita água"
        } else {
            "Superfície seca ou vegetada"
        }
    }
}

/// Urban versus surrounding-ring surface temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatIslandSummary {
    pub urban_temperature: f64,
    pub rural_temperature: f64,
}

impl HeatIslandSummary {
    pub fn intensity(&self) -> f64 {
        self.urban_temperature - self.rural_temperature
    }

    pub fn classification(&self) -> &'static str {
        let intensity = self.intensity();
        if intensity > 3.0 {
            "Ilha de calor forte"
        } else if intensity > 1.5 {
            "Ilha de calor moderada"
        } else {
            "Ilha de calor fraca"
        }
    }
}

/// Open water share of an area, from NDWI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterSummary {
    pub total_area_ha: f64,
    pub water_area_ha: f64,
    pub ndwi_mean: Option<f64>,
    pub ndwi_min: Option<f64>,
    pub ndwi_max: Option<f64>,
}

impl WaterSummary {
    pub fn water_percentage(&self) -> f64 {
        if self.total_area_ha > 0.0 {
            self.water_area_ha / self.total_area_ha * 100.0
        } else {
            0.0
        }
    }

    pub fn interpretation(&self) -> String {
        format!("{:.1}% da área possui água ou superfície úmida", self.water_percentage())
    }
}

/// Raw measurements feeding the area risk model.
///
/// Every field is optional because Earth Engine answers `null` when no pixel
/// in the period is usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaMeasurements {
    pub avg_temp_c: Option<f64>,
    pub extreme_heat_days: Option<u32>,
    pub ndvi_mean: Option<f64>,
    pub ndwi_mean: Option<f64>,
    pub elevation_m: Option<f64>,
}

/// Summary of a GeoJSON property across features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PropertySummary {
    Numeric { min: f64, max: f64, avg: f64 },
    Categorical { unique_count: usize, sample_values: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub total_features: usize,
    pub properties_summary: std::collections::BTreeMap<String, PropertySummary>,
}
