//! Session export to JSON or Markdown

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::types::{ContentPart, Session};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Markdown => f.write_str("markdown"),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(Error::InvalidArgument(format!("Unsupported export format: {}", s))),
        }
    }
}

/// Render a session in the requested format
pub fn export_session(session: &Session, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(session)?),
        ExportFormat::Markdown => Ok(to_markdown(session)),
    }
}

fn title_case(role: &str) -> String {
    role.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_markdown(session: &Session) -> String {
    let mut lines = vec![
        format!("# Conversation Session: {}", session.id),
        format!("**Created:** {}", session.created_at.to_rfc3339()),
        format!("**Updated:** {}", session.updated_at.to_rfc3339()),
        String::new(),
        "## Messages".to_string(),
        String::new(),
    ];

    for msg in session.messages() {
        lines.push(format!(
            "### {} ({})",
            title_case(msg.role.as_str()),
            msg.timestamp.to_rfc3339()
        ));
        for part in &msg.content {
            match part {
                ContentPart::Text { text } => lines.push(text.clone()),
                ContentPart::ToolResult(result) => lines.push(format!(
                    "```json\n// {}\n{}\n```",
                    result.name,
                    serde_json::to_string_pretty(&result.payload()).unwrap_or_default()
                )),
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
