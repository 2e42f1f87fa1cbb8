//! Run command tool

use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::ToolError;
use crate::tools::filesystem::{relative_display, resolve, validate_path};
use crate::tools::{BoxFuture, Tool};

use super::ShellConfig;

/// Tool for executing shell commands inside the workspace
pub struct RunCommand {
    config: ShellConfig,
    workspace: PathBuf,
}

impl RunCommand {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            config: ShellConfig::default(),
            workspace,
        }
    }

    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    fn blocked_pattern(&self, command: &str) -> Option<&str> {
        self.config
            .blocked_commands
            .iter()
            .find(|blocked| command.contains(blocked.as_str()))
            .map(String::as_str)
    }
}

impl Tool for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its exit code, stdout and stderr."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory for the command (relative to the working directory)"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 60)",
                    "default": 60
                }
            },
            "required": ["command"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let command = params["command"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidParams("command is required".into()))?;
            let timeout = params["timeout"].as_u64().unwrap_or(self.config.timeout_seconds);

            if let Some(pattern) = self.blocked_pattern(command) {
                return Err(ToolError::PermissionDenied(format!(
                    "Command contains blocked pattern: {}",
                    pattern
                )));
            }

            let working_dir = match params["working_dir"].as_str() {
                Some(dir) => validate_path(&resolve(dir, &self.workspace), &self.workspace)?,
                None => dunce::canonicalize(&self.workspace)?,
            };

            let child = Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&working_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output();

            let output = tokio::time::timeout(Duration::from_secs(timeout), child)
                .await
                .map_err(|_| ToolError::Timeout(timeout))??;

            Ok(json!({
                "command": command,
                "exit_code": output.status.code(),
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
                "success": output.status.success(),
                "working_dir": relative_display(&working_dir, &self.workspace)
            }))
        })
    }
}
