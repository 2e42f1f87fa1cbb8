//! Gateway request/response logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append one JSON object per
//! gateway call (request messages, tools, parsed response or error) to that
//! file.
//!
//! Example: `LLM_LOG_FILE=/tmp/llm.log toolloop ask "hi"`

use serde_json::json;
use std::io::Write;
use tracing::{debug, warn};

use super::{Generation, GenerationRequest, TokenUsage};

pub const LOG_FILE_ENV: &str = "LLM_LOG_FILE";

/// What a single log entry describes
pub struct LogEntry<'a> {
    pub model: &'a str,
    pub request: &'a GenerationRequest,
    pub generation: Option<&'a Generation>,
    pub usage: Option<&'a TokenUsage>,
    pub error: Option<&'a str>,
}

fn generation_to_json(generation: &Generation) -> serde_json::Value {
    match generation {
        Generation::Text(text) => json!({ "type": "message", "content": text }),
        Generation::ToolCalls { calls, text } => json!({
            "type": "tool_calls",
            "content": text,
            "tool_calls": calls,
        }),
        Generation::Empty => json!({ "type": "empty" }),
    }
}

/// Append an entry to `LLM_LOG_FILE`, if set. Failures only warn.
pub fn log_interaction(entry: LogEntry<'_>) {
    let Ok(log_file) = std::env::var(LOG_FILE_ENV) else {
        return;
    };

    let record = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": entry.model,
        "request": {
            "system_instruction": entry.request.system_instruction,
            "messages": entry.request.messages,
            "message_count": entry.request.messages.len(),
            "tools": entry.request.tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
            "temperature": entry.request.temperature,
            "max_tokens": entry.request.max_tokens,
        },
        "response": entry.generation.map(generation_to_json),
        "usage": entry.usage,
        "error": entry.error,
    });

    let line = match serde_json::to_string(&record) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize gateway log entry: {}", e);
            return;
        }
    };

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("Failed to write to gateway log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open gateway log file {}: {}", log_file, e);
        }
    }

    debug!("Logged gateway interaction to {}", log_file);
}
