//! Write file tool

use serde_json::{json, Value};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::{relative_display, resolve, validate_write_path};

/// Tool for writing file contents
pub struct WriteFile {
    workspace: PathBuf,
}

impl WriteFile {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file with the given content. Optionally keeps a .bak copy of the previous version."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to write (relative to the working directory)"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                },
                "create_dirs": {
                    "type": "boolean",
                    "description": "Create missing parent directories (default: true)",
                    "default": true
                },
                "backup": {
                    "type": "boolean",
                    "description": "Copy an existing file to <name>.bak before overwriting (default: false)",
                    "default": false
                }
            },
            "required": ["file_path", "content"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let path_str = params["file_path"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidParams("file_path is required".into()))?;
            let content = params["content"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidParams("content is required".into()))?;
            let create_dirs = params["create_dirs"].as_bool().unwrap_or(true);
            let backup = params["backup"].as_bool().unwrap_or(false);

            let path = validate_write_path(&resolve(path_str, &self.workspace), &self.workspace)?;

            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    if create_dirs {
                        tokio::fs::create_dir_all(parent).await?;
                    } else {
                        return Err(ToolError::ResourceNotFound(format!(
                            "Parent directory does not exist: {}",
                            relative_display(parent, &self.workspace)
                        )));
                    }
                }
            }

            let mut backup_path = None;
            if backup && path.is_file() {
                let mut name = path.as_os_str().to_os_string();
                name.push(".bak");
                let bak = PathBuf::from(name);
                tokio::fs::copy(&path, &bak).await?;
                backup_path = Some(relative_display(&bak, &self.workspace));
            }

            tokio::fs::write(&path, content).await?;

            Ok(json!({
                "file_path": relative_display(&path, &self.workspace),
                "bytes_written": content.len(),
                "backup_path": backup_path
            }))
        })
    }
}
