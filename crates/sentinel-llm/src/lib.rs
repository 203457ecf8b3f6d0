//! Sentinel LLM - Text generation port and hosted model adapters
//!
//! This crate defines the generation port used by the assistant, adapters
//! for Gemini and OpenAI, and a wrapper that throttles and retries calls
//! when the provider reports rate limiting.

pub mod gemini;
pub mod openai;
pub mod ports;
pub mod resilient;

// Re-export main types
pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;
pub use ports::{GenerationRequest, Generator};
pub use resilient::{ResilientGenerator, RetryPolicy};
