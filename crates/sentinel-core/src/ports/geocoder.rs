use async_trait::async_trait;

use crate::error::Result;
use crate::models::Coordinate;

/// Port for reverse geocoding
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a position to a "Municipality, State" label.
    ///
    /// Returns `Ok(None)` when the service answers but knows no place there.
    async fn reverse(&self, at: Coordinate) -> Result<Option<String>>;
}
