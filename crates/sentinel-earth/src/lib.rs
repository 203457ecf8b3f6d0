//! Sentinel Earth - Earth Engine REST adapter
//!
//! Builds expression graphs for satellite layers and spectral indices and
//! evaluates them remotely; no pixel data is processed locally.

pub mod auth;
pub mod client;
pub mod expr;
pub mod indices;

pub use auth::{AccessTokenSource, ServiceAccountAuth, ServiceAccountKey, StaticToken};
pub use client::{EarthEngineClient, EarthEngineSettings, EARTH_ENGINE_URL};
pub use expr::Expr;
