//! Message normalization
//!
//! Turns stored session history plus fresh user input into a message list the
//! gateway will accept: only `user`/`model` roles, no blank text, no empty
//! messages, and never an empty list.

use tracing::warn;

use crate::provider::{GatewayMessage, GatewayPart, GatewayRole};
use crate::session::{ContentPart, Message, Role};

/// Sent in place of blank user input
pub const PLACEHOLDER_INPUT: &str = "Hello";

/// Default number of history messages carried into a request
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct MessageNormalizer {
    context_window: usize,
}

impl Default for MessageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}

impl MessageNormalizer {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    /// Normalize the tail of `history` followed by `new_input`.
    pub fn normalize(&self, history: &[Message], new_input: &str) -> Vec<GatewayMessage> {
        let start = history.len().saturating_sub(self.context_window);
        let mut out: Vec<GatewayMessage> = history[start..]
            .iter()
            .filter_map(convert_message)
            .collect();

        let input = new_input.trim();
        out.push(GatewayMessage::user_text(if input.is_empty() {
            PLACEHOLDER_INPUT
        } else {
            input
        }));
        out
    }
}

fn convert_message(msg: &Message) -> Option<GatewayMessage> {
    let role = match msg.role {
        Role::User => GatewayRole::User,
        Role::Assistant => GatewayRole::Model,
        other => {
            warn!(message_id = %msg.id, role = %other, "Dropping message with unsupported role");
            return None;
        }
    };

    let parts: Vec<GatewayPart> = msg
        .content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| GatewayPart::text(trimmed))
            }
            ContentPart::ToolResult(result) => Some(GatewayPart::FunctionResponse(result.clone())),
        })
        .collect();

    if parts.is_empty() {
        warn!(message_id = %msg.id, "Dropping message with no usable content");
        return None;
    }

    Some(GatewayMessage { role, parts })
}

/// Drop anything that would be rejected by the gateway; fall back to the
/// placeholder if nothing is left.
pub fn validate(messages: Vec<GatewayMessage>) -> Vec<GatewayMessage> {
    let mut valid: Vec<GatewayMessage> = messages
        .into_iter()
        .filter_map(|mut msg| {
            msg.parts.retain(GatewayPart::is_valid);
            if msg.parts.is_empty() {
                warn!(role = ?msg.role, "Dropping empty message before gateway call");
                None
            } else {
                Some(msg)
            }
        })
        .collect();

    if valid.is_empty() {
        valid.push(GatewayMessage::user_text(PLACEHOLDER_INPUT));
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolCall, ToolResult};
    use serde_json::{json, Map};

    #[test]
    fn test_blank_input_becomes_placeholder() {
        let out = MessageNormalizer::default().normalize(&[], "   ");
        assert_eq!(out, vec![GatewayMessage::user_text("Hello")]);
    }

    #[test]
    fn test_roles_mapped_and_text_trimmed() {
        let history = vec![Message::user("  hi  "), Message::assistant("hello\n")];
        let out = MessageNormalizer::default().normalize(&history, "next");

        assert_eq!(out.len(), 3);
        assert_eq!(out[0], GatewayMessage::user_text("hi"));
        assert_eq!(out[1], GatewayMessage::model_text("hello"));
        assert_eq!(out[2], GatewayMessage::user_text("next"));
    }

    #[test]
    fn test_drops_tool_result_role_and_blank_messages() {
        let call = ToolCall::new("x", Map::new());
        let history = vec![
            Message::user(""),
            Message::tool_results(vec![ToolResult::success(&call, json!(1))]),
            Message::assistant("kept"),
        ];
        let out = MessageNormalizer::default().normalize(&history, "go");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], GatewayMessage::model_text("kept"));
    }

    #[test]
    fn test_context_window_limits_history() {
        let history: Vec<Message> = (0..25).map(|i| Message::user(format!("m{}", i))).collect();
        let out = MessageNormalizer::new(10).normalize(&history, "now");
        assert_eq!(out.len(), 11);
        assert_eq!(out[0], GatewayMessage::user_text("m15"));
    }

    #[test]
    fn test_validate_strips_blank_parts() {
        let messages = vec![
            GatewayMessage {
                role: GatewayRole::Model,
                parts: vec![GatewayPart::text(" "), GatewayPart::text("ok")],
            },
            GatewayMessage {
                role: GatewayRole::User,
                parts: vec![GatewayPart::text("")],
            },
        ];
        let out = validate(messages);
        assert_eq!(out, vec![GatewayMessage::model_text("ok")]);
        assert_eq!(validate(Vec::new()), vec![GatewayMessage::user_text("Hello")]);
    }
}
