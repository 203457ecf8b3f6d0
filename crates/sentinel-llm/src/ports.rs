//! Generation port definitions

use async_trait::async_trait;
use sentinel_core::error::Result;
use sentinel_core::models::ChatTurn;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One call to a text generation model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Persona and rules sent as the system turn
    pub system_instruction: Option<String>,
    /// Earlier turns of the conversation, oldest first
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            history: Vec::new(),
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: &[ChatTurn]) -> Self {
        self.history = history.to_vec();
        self
    }
}

/// Port for text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply.
    ///
    /// Implementations report provider throttling as
    /// `SentinelError::RateLimited` so callers can retry.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Get the name/identifier of the generation model
    fn model_name(&self) -> &str;
}
