//! Sentinel Core - Domain models, risk scoring, chat routing and configuration
//!
//! This crate contains the domain logic and port definitions shared by the
//! Earth Engine, LLM and HTTP crates of the Sentinel backend.

pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod risk;

pub use error::{Result, SentinelError};
