//! System prompt management
//!
//! The system instruction is a template with two placeholders,
//! `{working_dir}` and `{available_tools}`, filled in per agent.

use std::path::{Path, PathBuf};

/// System prompt template and the values substituted into it
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    template: String,
    working_dir: Option<PathBuf>,
    tools: Vec<String>,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPrompt {
    /// Create a new system prompt with the default template
    pub fn new() -> Self {
        Self::with_template(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            working_dir: None,
            tools: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = names.into_iter().map(Into::into).collect();
        self
    }

    /// Build the final system prompt
    pub fn build(&self) -> String {
        let working_dir = self
            .working_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        self.template
            .replace("{working_dir}", &working_dir)
            .replace("{available_tools}", &self.tools.join(", "))
    }
}

/// Default system prompt template
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI coding assistant that works inside the user's project directory.

You can:
1. Read, write, list and search files in the working directory
2. Run shell commands and report their output
3. Inspect the host system and its running processes

Guidelines:
- Use tools to gather facts before answering; do not guess file contents
- Prefer small, verifiable steps and report what each tool call returned
- Ask for clarification when a request is ambiguous
- Never touch files outside the working directory

Current working directory: {working_dir}
Available tools: {available_tools}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_filled() {
        let prompt = SystemPrompt::new()
            .with_working_dir(Path::new("/tmp/project"))
            .with_tools(["read_file", "list_files"])
            .build();
        assert!(prompt.contains("Current working directory: /tmp/project"));
        assert!(prompt.contains("Available tools: read_file, list_files"));
        assert!(!prompt.contains("{working_dir}"));
    }

    #[test]
    fn test_custom_template() {
        let prompt = SystemPrompt::with_template("dir={working_dir}").build();
        assert_eq!(prompt, "dir=.");
    }
}
