//! toolloop core - a tool-using conversational agent
//!
//! This crate provides:
//! - The generation-retry-tool-dispatch loop and the `Agent` request API
//! - Sessions with file-backed persistence, search and export
//! - A tool registry with file system, shell and system tools
//! - A model gateway abstraction with a `genai` implementation
//! - Request and tool metrics

pub mod agent;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestration;
pub mod provider;
pub mod session;
pub mod tools;

pub use agent::Agent;
pub use config::{defaults, Config, ConfigManager};
pub use error::{Error, Result, ToolError};
pub use metrics::{Metrics, MetricsSnapshot, ToolStats};
pub use provider::{
    GatewayError, GatewayMessage, GatewayPart, GatewayRole, GenAIProvider, Generation,
    GenerationRequest, GenerationResponse, ModelGateway, TokenUsage,
};
pub use tools::{Tool, ToolCall, ToolDefinition, ToolOutcome, ToolRegistry, ToolResult};

// Orchestration exports
pub use orchestration::{
    create_standard_tool_registry, MessageNormalizer, SystemPrompt, ToolRegistryBuilder,
};

// Session exports
pub use session::{
    AgentLoop, ConversationManager, ExportFormat, FileSessionStore, LoopOutcome, LoopSettings,
    MemorySessionStore, Message, Role, SearchHit, Session, SessionStatistics, SessionStore,
    FALLBACK_RESPONSE,
};
