//! Read file tool

use serde_json::{json, Value};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::{relative_display, resolve, validate_path, MAX_FILE_SIZE};

/// Tool for reading file contents
pub struct ReadFile {
    workspace: PathBuf,
    max_size: u64,
}

impl ReadFile {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            max_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file. Returns the content with its size and line count."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to read (relative to the working directory)"
                },
                "encoding": {
                    "type": "string",
                    "description": "Text encoding (only utf-8 is supported)",
                    "default": "utf-8"
                }
            },
            "required": ["file_path"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let path_str = params["file_path"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidParams("file_path is required".into()))?;

            let encoding = params["encoding"].as_str().unwrap_or("utf-8");
            if !encoding.eq_ignore_ascii_case("utf-8") && !encoding.eq_ignore_ascii_case("utf8") {
                return Err(ToolError::InvalidParams(format!("Unsupported encoding: {}", encoding)));
            }

            let validated = validate_path(&resolve(path_str, &self.workspace), &self.workspace)?;
            let metadata = tokio::fs::metadata(&validated).await?;
            if !metadata.is_file() {
                return Err(ToolError::InvalidParams(format!("Not a file: {}", path_str)));
            }
            if metadata.len() > self.max_size {
                return Err(ToolError::ExecutionFailed(format!(
                    "File too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    self.max_size
                )));
            }

            let content = tokio::fs::read_to_string(&validated).await?;

            Ok(json!({
                "content": content,
                "file_path": relative_display(&validated, &self.workspace),
                "file_size": metadata.len(),
                "lines": content.lines().count(),
                "encoding": "utf-8"
            }))
        })
    }
}
