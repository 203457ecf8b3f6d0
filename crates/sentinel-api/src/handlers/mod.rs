mod agent;
mod geojson;
mod health;
mod imagery;
mod risk;

pub use agent::{agent_health, analyze_region, chat, chat_text};
pub use geojson::{list_geojson, load_geojson, render_layer};
pub use health::{health_check, root};
pub use imagery::{get_analysis_data, get_dem, get_tile, list_images};
pub use risk::analyze_area;
