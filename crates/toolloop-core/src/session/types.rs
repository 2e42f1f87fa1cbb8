//! Conversation data model: messages and sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::tools::ToolResult;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResult => "tool_result",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolResult(ToolResult),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ContentPart::Text { text } => !text.trim().is_empty(),
            ContentPart::ToolResult(_) => true,
        }
    }
}

/// A message in a session. Once appended it is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique ID for this message
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentPart>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Create a new user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create a new assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self::new(
            Role::ToolResult,
            results.into_iter().map(ContentPart::ToolResult).collect(),
        )
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ToolResult(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// At least one tool result or non-blank text part
    pub fn is_valid(&self) -> bool {
        self.content.iter().any(ContentPart::is_valid)
    }

    /// Case-insensitive substring match over text and tool-result payloads.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.content.iter().any(|part| match part {
            ContentPart::Text { text } => text.to_lowercase().contains(needle),
            ContentPart::ToolResult(result) => {
                result.payload().to_string().to_lowercase().contains(needle)
            }
        })
    }
}

/// An ordered conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    messages: Vec<Message>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message and bump `updated_at`
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now().max(self.created_at);
    }

    /// The last `k` messages
    pub fn context_window(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    pub fn contains_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.messages.iter().any(|m| m.matches_lowercase(&needle))
    }

    /// One-line description: id prefix, size, duration, first and last query
    pub fn summarize(&self) -> String {
        if self.messages.is_empty() {
            return "Empty conversation".to_string();
        }

        let id_prefix: String = self.id.chars().take(8).collect();
        let duration = (self.updated_at - self.created_at).num_milliseconds() as f64 / 1000.0;
        let mut parts = vec![
            format!("Session ID: {}...", id_prefix),
            format!("Messages: {}", self.messages.len()),
            format!("Duration: {:.1}s", duration),
        ];

        let user_texts: Vec<String> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(Message::text)
            .collect();
        if let Some(first) = user_texts.first() {
            parts.push(format!("First query: {}...", truncate_chars(first, 50)));
            if user_texts.len() > 1 {
                if let Some(last) = user_texts.last() {
                    parts.push(format!("Last query: {}...", truncate_chars(last, 50)));
                }
            }
        }

        parts.join(" | ")
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
