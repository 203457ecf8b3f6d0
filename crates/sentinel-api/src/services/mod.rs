mod chat;
mod region;
mod risk;

pub use chat::{ChatService, BUSY_REPLY, EMPTY_REPLY};
pub use region::{RegionService, AGENT_NAME};
pub use risk::RiskService;
