//! Chat routing, prompt composition and reply post-processing

pub mod dialect;
pub mod dispatch;
pub mod fallback;
pub mod prompt;

pub use dialect::{dialectize, normalize_slang};
pub use dispatch::{
    dispatch, enrich_message, render_data_block, resolve_layer, Capability, ContextField,
    Invocation, Route, ToolOutcome, LAYER_HINTS, ROUTES,
};
pub use fallback::{classify, fallback_response, Topic};
pub use prompt::{
    chat_prompt, region_prompt, RegionBrief, ANALYSIS_INSTRUCTION, ASSISTANT_NAME, CHAT_INSTRUCTION,
};
