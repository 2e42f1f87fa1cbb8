//! Orchestration helpers shared by the loop and its callers
//!
//! - Message normalization before every gateway call
//! - System prompt rendering
//! - Standard tool registry construction

pub mod normalizer;
mod system_prompt;
mod tool_registry;

pub use normalizer::{MessageNormalizer, PLACEHOLDER_INPUT};
pub use system_prompt::{SystemPrompt, DEFAULT_SYSTEM_PROMPT};
pub use tool_registry::{create_standard_tool_registry, ToolRegistryBuilder};
