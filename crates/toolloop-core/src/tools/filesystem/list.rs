//! List files tool

use serde_json::{json, Value};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::{relative_display, resolve, validate_path};

/// Tool for listing directory contents
pub struct ListFiles {
    workspace: PathBuf,
}

impl ListFiles {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

fn entry_kind(file_type: std::fs::FileType) -> &'static str {
    if file_type.is_symlink() {
        "link"
    } else if file_type.is_dir() {
        "dir"
    } else {
        "file"
    }
}

impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in a directory, optionally recursively, filtered by a glob pattern and entry type."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to list (relative to the working directory)",
                    "default": "."
                },
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern matched against entry names (e.g. *.rs)",
                    "default": "*"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "List recursively",
                    "default": false
                },
                "include_hidden": {
                    "type": "boolean",
                    "description": "Include hidden entries (starting with .)",
                    "default": false
                },
                "file_type": {
                    "type": "string",
                    "enum": ["file", "dir", "link"],
                    "description": "Only return entries of this type"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of entries to return",
                    "default": 100
                }
            }
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let dir_str = params["directory"].as_str().unwrap_or(".");
            let pattern_str = params["pattern"].as_str().unwrap_or("*");
            let recursive = params["recursive"].as_bool().unwrap_or(false);
            let include_hidden = params["include_hidden"].as_bool().unwrap_or(false);
            let file_type = params["file_type"].as_str();
            let limit = params["limit"].as_u64().unwrap_or(100) as usize;

            let pattern = glob::Pattern::new(pattern_str)
                .map_err(|e| ToolError::InvalidParams(format!("Invalid pattern '{}': {}", pattern_str, e)))?;

            let validated = validate_path(&resolve(dir_str, &self.workspace), &self.workspace)?;
            if !validated.is_dir() {
                return Err(ToolError::InvalidParams(format!("Not a directory: {}", dir_str)));
            }

            let max_depth = if recursive { usize::MAX } else { 1 };
            let mut entries = Vec::new();
            for entry in walkdir::WalkDir::new(&validated)
                .min_depth(1)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0 || include_hidden || !e.file_name().to_string_lossy().starts_with('.')
                })
                .filter_map(|e| e.ok())
            {
                let name = entry.file_name().to_string_lossy().to_string();
                if !pattern.matches(&name) {
                    continue;
                }

                let kind = entry_kind(entry.file_type());
                if file_type.is_some_and(|wanted| wanted != kind) {
                    continue;
                }

                let size = entry.metadata().ok().filter(|m| m.is_file()).map(|m| m.len());
                entries.push(json!({
                    "name": name,
                    "path": relative_display(entry.path(), &self.workspace),
                    "type": kind,
                    "size": size,
                }));
            }

            let total = entries.len();
            entries.truncate(limit);

            Ok(json!({
                "directory": relative_display(&validated, &self.workspace),
                "count": entries.len(),
                "total": total,
                "files": entries
            }))
        })
    }
}
