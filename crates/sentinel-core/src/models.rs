pub mod chat;
pub mod imagery;
pub mod layer;
pub mod polygon;
pub mod risk;

pub use chat::{ChatContext, ChatRole, ChatTurn, ContextUpdate, HISTORY_LIMIT};
pub use imagery::{
    AreaMeasurements, DateRange, ElevationSummary, FeatureSummary, HeatIslandSummary, ImageQuery,
    ImageListing, ImageSummary, IndexStats, LayerStatistics, LayerTile, PropertySummary,
    SarSummary, WaterSummary,
};
pub use layer::{LayerType, Sensor};
pub use polygon::{Coordinate, Polygon, Vertex};
pub use risk::{RiskAssessment, RiskBreakdown, RiskInputs, RiskLevel};
