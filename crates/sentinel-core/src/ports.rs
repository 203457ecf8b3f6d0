//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod earth;
pub mod geocoder;

pub use earth::EarthEngine;
pub use geocoder::Geocoder;
