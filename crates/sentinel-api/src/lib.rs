pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod services;
pub mod sessions;
pub mod state;

pub use config::ApiConfig;
pub use router::{cors_layer, create_router};
pub use state::AppState;
