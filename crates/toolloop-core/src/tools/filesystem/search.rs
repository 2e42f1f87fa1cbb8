//! Search files tool

use regex::RegexBuilder;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::{relative_display, resolve, validate_path};

/// Files larger than this are not searched for content
const MAX_SEARCH_FILE_SIZE: u64 = 1024 * 1024;

/// Tool for searching files by name or content
pub struct SearchFiles {
    workspace: PathBuf,
}

impl SearchFiles {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

impl Tool for SearchFiles {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files by name pattern and/or content (case-insensitive regex). Returns matching paths and lines."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to search in (relative to the working directory)",
                    "default": "."
                },
                "name_pattern": {
                    "type": "string",
                    "description": "Filename glob pattern (e.g. *.rs)"
                },
                "content_pattern": {
                    "type": "string",
                    "description": "Regex searched for in file contents (case-insensitive)"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of files to return",
                    "default": 50
                }
            }
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let dir_str = params["directory"].as_str().unwrap_or(".");
            let max_results = params["max_results"].as_u64().unwrap_or(50) as usize;

            let name_pattern = params["name_pattern"]
                .as_str()
                .map(glob::Pattern::new)
                .transpose()
                .map_err(|e| ToolError::InvalidParams(format!("Invalid name_pattern: {}", e)))?;
            let content_regex = params["content_pattern"]
                .as_str()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .transpose()
                .map_err(|e| ToolError::InvalidParams(format!("Invalid content_pattern: {}", e)))?;

            let validated = validate_path(&resolve(dir_str, &self.workspace), &self.workspace)?;

            let mut results = Vec::new();
            let mut truncated = false;
            for entry in walkdir::WalkDir::new(&validated)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if results.len() >= max_results {
                    truncated = true;
                    break;
                }

                let file_name = entry.file_name().to_string_lossy();
                if let Some(ref glob) = name_pattern {
                    if !glob.matches(&file_name) {
                        continue;
                    }
                }

                let mut matches = Vec::new();
                if let Some(ref regex) = content_regex {
                    let too_big = entry.metadata().map(|m| m.len() > MAX_SEARCH_FILE_SIZE).unwrap_or(true);
                    if too_big {
                        continue;
                    }
                    // Binary or unreadable files never match
                    let Ok(content) = std::fs::read_to_string(entry.path()) else {
                        continue;
                    };
                    for (i, line) in content.lines().enumerate() {
                        if regex.is_match(line) {
                            matches.push(json!({ "line_number": i + 1, "content": line.trim() }));
                        }
                    }
                    if matches.is_empty() {
                        continue;
                    }
                }

                results.push(json!({
                    "path": relative_display(entry.path(), &self.workspace),
                    "name": file_name,
                    "matches": matches,
                }));
            }

            Ok(json!({
                "results": results,
                "count": results.len(),
                "truncated": truncated
            }))
        })
    }
}
