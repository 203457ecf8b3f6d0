use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AreaMeasurements, DateRange, ElevationSummary, HeatIslandSummary, ImageListing, ImageQuery,
    IndexStats, LayerStatistics, LayerTile, LayerType, Polygon, SarSummary, WaterSummary,
};

/// Port for the remote raster engine.
///
/// Implementations build the request and let the remote service do all pixel
/// work; nothing here touches raster data locally.
#[async_trait]
pub trait EarthEngine: Send + Sync {
    /// List images available for a layer, newest first
    async fn list_images(&self, query: &ImageQuery) -> Result<ImageListing>;

    /// Render a layer and return a map tile URL template
    async fn layer_tile(&self, query: &ImageQuery) -> Result<LayerTile>;

    /// Mean NDVI, NDWI and land surface temperature over an area
    async fn index_stats(&self, polygon: &Polygon, dates: &DateRange) -> Result<IndexStats>;

    /// Elevation tile and range from the SRTM model
    async fn elevation(&self, polygon: &Polygon) -> Result<ElevationSummary>;

    /// Mean, min, max and standard deviation of one layer's best image
    async fn layer_statistics(
        &self,
        polygon: &Polygon,
        layer: LayerType,
        dates: &DateRange,
    ) -> Result<LayerStatistics>;

    /// Median Sentinel-1 VV backscatter
    async fn sar_backscatter(&self, polygon: &Polygon, dates: &DateRange) -> Result<SarSummary>;

    /// Surface temperature inside the area versus a surrounding ring
    async fn heat_island(&self, polygon: &Polygon, dates: &DateRange)
        -> Result<HeatIslandSummary>;

    /// Water share of the area from NDWI
    async fn water_bodies(&self, polygon: &Polygon, dates: &DateRange) -> Result<WaterSummary>;

    /// Everything the area risk model needs, in one round
    async fn area_measurements(
        &self,
        polygon: &Polygon,
        dates: &DateRange,
    ) -> Result<AreaMeasurements>;

    /// Cheap authenticated call used by health checks
    async fn ping(&self) -> Result<()>;
}
