//! Model gateway abstraction
//!
//! The loop talks to a remote model only through [`ModelGateway`]. A gateway
//! receives a strictly alternating-compatible list of [`GatewayMessage`]s plus
//! tool declarations and answers with a [`Generation`]: text, tool calls, or
//! nothing. Failures are classified as transient (worth retrying) or terminal.

pub mod genai_provider;
pub mod logging;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::{ToolCall, ToolDefinition, ToolResult};

pub use genai_provider::GenAIProvider;

/// Role vocabulary of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayRole {
    User,
    Model,
}

/// One part of a gateway message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayPart {
    Text { text: String },
    FunctionCall(ToolCall),
    FunctionResponse(ToolResult),
}

impl GatewayPart {
    pub fn text(text: impl Into<String>) -> Self {
        GatewayPart::Text { text: text.into() }
    }

    /// Text parts must be non-blank; call and response parts always count.
    pub fn is_valid(&self) -> bool {
        match self {
            GatewayPart::Text { text } => !text.trim().is_empty(),
            GatewayPart::FunctionCall(_) | GatewayPart::FunctionResponse(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub role: GatewayRole,
    pub parts: Vec<GatewayPart>,
}

impl GatewayMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: GatewayRole::User,
            parts: vec![GatewayPart::text(text)],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: GatewayRole::Model,
            parts: vec![GatewayPart::text(text)],
        }
    }

    /// One user message carrying every tool result of a round trip.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: GatewayRole::User,
            parts: results.into_iter().map(GatewayPart::FunctionResponse).collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(GatewayPart::is_valid)
    }
}

/// Input to a single generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<GatewayMessage>,
    pub tools: Vec<ToolDefinition>,
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// What the model produced
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    ToolCalls {
        calls: Vec<ToolCall>,
        text: Option<String>,
    },
    Empty,
}

impl Generation {
    /// Tool calls win over text; blank text is the same as none.
    pub fn from_parts(text: Option<String>, calls: Vec<ToolCall>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        if !calls.is_empty() {
            Generation::ToolCalls { calls, text }
        } else if let Some(text) = text {
            Generation::Text(text)
        } else {
            Generation::Empty
        }
    }

    /// The response as a model-role message, if it has anything to say.
    pub fn to_message(&self) -> Option<GatewayMessage> {
        let parts: Vec<GatewayPart> = match self {
            Generation::Text(text) => vec![GatewayPart::text(text.clone())],
            Generation::ToolCalls { calls, text } => text
                .iter()
                .map(|t| GatewayPart::text(t.clone()))
                .chain(calls.iter().cloned().map(GatewayPart::FunctionCall))
                .collect(),
            Generation::Empty => Vec::new(),
        };

        let message = GatewayMessage {
            role: GatewayRole::Model,
            parts,
        };
        message.is_valid().then_some(message)
    }
}

/// Token counts reported by the provider; either side may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens.unwrap_or(0) + self.completion_tokens.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub generation: Generation,
    pub usage: TokenUsage,
}

impl GenerationResponse {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Gateway failure, split by whether a retry can help
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("{0}")]
    Terminal(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    /// Classify by HTTP status: 429 and 5xx are worth retrying.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if is_transient_status(status) {
            GatewayError::Transient(message.into())
        } else {
            GatewayError::Terminal(message.into())
        }
    }

    /// Classify a raw provider error message when no status or transport
    /// error is available.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient_message(&message) {
            GatewayError::Transient(message)
        } else {
            GatewayError::Terminal(message)
        }
    }
}

pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Whole-token phrases that mark a retryable failure
const TRANSIENT_PHRASES: &[&[&str]] = &[
    &["rate", "limit"],
    &["ratelimit"],
    &["too", "many", "requests"],
    &["timeout"],
    &["timed", "out"],
    &["resource_exhausted"],
    &["unavailable"],
    &["overloaded"],
    &["internal", "server", "error"],
    &["bad", "gateway"],
    &["connection", "refused"],
    &["connection", "reset"],
];

/// Text fallback. The first three-digit token that looks like an HTTP status
/// decides; otherwise a whole-token phrase match marks the failure as
/// transient.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();

    let status = tokens
        .iter()
        .filter(|t| t.len() == 3 && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse::<u16>().ok())
        .find(|code| (100..=599).contains(code));
    if let Some(status) = status {
        return is_transient_status(status);
    }

    TRANSIENT_PHRASES
        .iter()
        .any(|phrase| tokens.windows(phrase.len()).any(|w| w == *phrase))
}

/// Async interface to a language-model service
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_from_parts_prefers_calls() {
        let call = ToolCall::new("list_files", Map::new());
        let generation = Generation::from_parts(Some("Let me check".into()), vec![call.clone()]);
        assert_eq!(
            generation,
            Generation::ToolCalls {
                calls: vec![call],
                text: Some("Let me check".into())
            }
        );
    }

    #[test]
    fn test_from_parts_blank_text_is_empty() {
        assert_eq!(Generation::from_parts(Some("  \n".into()), vec![]), Generation::Empty);
        assert_eq!(Generation::from_parts(None, vec![]), Generation::Empty);
        assert_eq!(
            Generation::from_parts(Some("hi".into()), vec![]),
            Generation::Text("hi".into())
        );
    }

    #[test]
    fn test_empty_generation_has_no_message() {
        assert!(Generation::Empty.to_message().is_none());
        let msg = Generation::Text("done".into()).to_message().unwrap();
        assert_eq!(msg.role, GatewayRole::Model);
    }

    #[test]
    fn test_classify() {
        assert!(GatewayError::classify("HTTP 429 Too Many Requests").is_transient());
        assert!(GatewayError::classify("status 503 UNAVAILABLE").is_transient());
        assert!(GatewayError::classify("request timed out").is_transient());
        assert!(GatewayError::classify("RESOURCE_EXHAUSTED: quota").is_transient());
        assert!(!GatewayError::classify("400 invalid argument: bad schema").is_transient());
        assert!(!GatewayError::classify("401 API key not valid").is_transient());
    }

    #[test]
    fn test_classify_uses_leading_status_not_stray_digits() {
        let permanent = [
            "400 Bad Request: max_output_tokens must be <= 65536, got 150000",
            "400 INVALID_ARGUMENT: prompt is 2500 tokens too long",
            "403 PERMISSION_DENIED: caller lacks access, see connection settings",
            "404 model gemini-9-ultra not found (tried 503 replicas)",
        ];
        for message in permanent {
            assert!(!GatewayError::classify(message).is_transient(), "{}", message);
        }

        assert!(GatewayError::classify("upstream returned 502 Bad Gateway").is_transient());
        assert!(GatewayError::classify("connection reset by peer").is_transient());
        assert!(!GatewayError::classify("invalid connection settings").is_transient());
        assert!(!GatewayError::classify("quota id 15003 exceeded for project").is_transient());
    }

    #[test]
    fn test_from_status() {
        assert!(GatewayError::from_status(429, "slow down").is_transient());
        assert!(GatewayError::from_status(500, "oops").is_transient());
        assert!(GatewayError::from_status(504, "late").is_transient());
        assert!(!GatewayError::from_status(400, "got 150000, 503 in body").is_transient());
        assert!(!GatewayError::from_status(403, "denied").is_transient());
    }

    #[test]
    fn test_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: None,
            completion_tokens: Some(7),
        };
        assert_eq!(usage.total(), 7);
        assert_eq!(TokenUsage::default().total(), 0);
    }
}
