//! Tool integration tests
//!
//! File system, shell and system tools executed directly and through the
//! registry.

use serde_json::{json, Map, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use toolloop_core::error::ToolError;
use toolloop_core::tools::filesystem::{ListFiles, ReadFile, SearchFiles, WriteFile};
use toolloop_core::tools::shell::{RunCommand, ShellConfig};
use toolloop_core::tools::system::{GetSystemInfo, ManageProcesses};
use toolloop_core::tools::{Tool, ToolCall, ToolOutcome};
use toolloop_core::{create_standard_tool_registry, Metrics};

/// Create a temporary test directory with sample files
fn setup_test_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let base = dir.path();

    fs::create_dir_all(base.join("src")).unwrap();
    fs::create_dir_all(base.join("docs")).unwrap();

    fs::write(
        base.join("src/main.rs"),
        "fn main() {\n    println!(\"Hello, world!\");\n}\n",
    )
    .unwrap();
    fs::write(base.join("src/lib.rs"), "pub fn greet() -> &'static str {\n    \"hi\"\n}\n").unwrap();
    fs::write(base.join("docs/guide.md"), "# Guide\n\nTODO: write the guide\n").unwrap();
    fs::write(base.join(".hidden"), "secret").unwrap();

    dir
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

mod read_file_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_file() {
        let dir = setup_test_dir();
        let tool = ReadFile::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "file_path": "src/main.rs" })).await.unwrap();
        assert!(result["content"].as_str().unwrap().contains("Hello, world!"));
        assert_eq!(result["lines"], 3);
        assert_eq!(result["file_path"], "src/main.rs");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = setup_test_dir();
        let tool = ReadFile::new(dir.path().to_path_buf());

        let err = tool.execute(json!({ "file_path": "nope.txt" })).await.unwrap_err();
        assert!(matches!(err, ToolError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_outside_workspace() {
        let dir = setup_test_dir();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("x.txt"), "x").unwrap();
        let tool = ReadFile::new(dir.path().to_path_buf());

        let path = outside.path().join("x.txt");
        let err = tool
            .execute(json!({ "file_path": path.to_string_lossy() }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));

        let err = tool
            .execute(json!({ "file_path": "../../etc/passwd" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_) | ToolError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_rejects_other_encodings() {
        let dir = setup_test_dir();
        let tool = ReadFile::new(dir.path().to_path_buf());
        let err = tool
            .execute(json!({ "file_path": "src/main.rs", "encoding": "latin-1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}

mod write_file_tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_dirs() {
        let dir = setup_test_dir();
        let tool = WriteFile::new(dir.path().to_path_buf());

        let result = tool
            .execute(json!({ "file_path": "out/nested/new.txt", "content": "fresh" }))
            .await
            .unwrap();
        assert_eq!(result["bytes_written"], 5);
        assert_eq!(fs::read_to_string(dir.path().join("out/nested/new.txt")).unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_write_without_create_dirs() {
        let dir = setup_test_dir();
        let tool = WriteFile::new(dir.path().to_path_buf());

        let err = tool
            .execute(json!({ "file_path": "missing/new.txt", "content": "x", "create_dirs": false }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_write_with_backup() {
        let dir = setup_test_dir();
        let tool = WriteFile::new(dir.path().to_path_buf());

        let result = tool
            .execute(json!({ "file_path": "src/lib.rs", "content": "// replaced\n", "backup": true }))
            .await
            .unwrap();
        assert_eq!(result["backup_path"], "src/lib.rs.bak");
        assert!(fs::read_to_string(dir.path().join("src/lib.rs.bak")).unwrap().contains("greet"));
        assert_eq!(fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(), "// replaced\n");
    }

    #[tokio::test]
    async fn test_write_outside_workspace() {
        let dir = setup_test_dir();
        let tool = WriteFile::new(dir.path().to_path_buf());

        let err = tool
            .execute(json!({ "file_path": "../escape.txt", "content": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
    }
}

mod list_files_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_top_level_skips_hidden() {
        let dir = setup_test_dir();
        let tool = ListFiles::new(dir.path().to_path_buf());

        let result = tool.execute(json!({})).await.unwrap();
        let names: Vec<&str> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["docs", "src"]);

        let result = tool.execute(json!({ "include_hidden": true })).await.unwrap();
        assert_eq!(result["count"], 3);
    }

    #[tokio::test]
    async fn test_list_recursive_with_pattern_and_type() {
        let dir = setup_test_dir();
        let tool = ListFiles::new(dir.path().to_path_buf());

        let result = tool
            .execute(json!({ "recursive": true, "pattern": "*.rs", "file_type": "file" }))
            .await
            .unwrap();
        assert_eq!(result["count"], 2);
        let paths: Vec<&str> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["src/lib.rs", "src/main.rs"]);
    }

    #[tokio::test]
    async fn test_list_limit_reports_total() {
        let dir = setup_test_dir();
        let tool = ListFiles::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "recursive": true, "limit": 1 })).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["total"], 5);
    }
}

mod search_files_tests {
    use super::*;

    #[tokio::test]
    async fn test_search_by_name() {
        let dir = setup_test_dir();
        let tool = SearchFiles::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "name_pattern": "*.md" })).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["results"][0]["path"], "docs/guide.md");
    }

    #[tokio::test]
    async fn test_search_by_content_is_case_insensitive() {
        let dir = setup_test_dir();
        let tool = SearchFiles::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "content_pattern": "hello" })).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["results"][0]["matches"][0]["line_number"], 2);
    }

    #[tokio::test]
    async fn test_search_truncates() {
        let dir = setup_test_dir();
        let tool = SearchFiles::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "max_results": 1 })).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["truncated"], true);
    }

    #[tokio::test]
    async fn test_search_invalid_regex() {
        let dir = setup_test_dir();
        let tool = SearchFiles::new(dir.path().to_path_buf());

        let err = tool.execute(json!({ "content_pattern": "(" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}

mod run_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_run_simple_command() {
        let dir = setup_test_dir();
        let tool = RunCommand::new(dir.path().to_path_buf());

        let result = tool.execute(json!({ "command": "echo hello" })).await.unwrap();
        assert_eq!(result["exit_code"], 0);
        assert_eq!(result["success"], true);
        assert_eq!(result["stdout"].as_str().unwrap().trim(), "hello");
        assert_eq!(result["working_dir"], ".");
    }

    #[tokio::test]
    async fn test_run_in_subdirectory() {
        let dir = setup_test_dir();
        let tool = RunCommand::new(dir.path().to_path_buf());

        let result = tool
            .execute(json!({ "command": "ls", "working_dir": "src" }))
            .await
            .unwrap();
        assert!(result["stdout"].as_str().unwrap().contains("main.rs"));
    }

    #[tokio::test]
    async fn test_failing_command_is_not_an_error() {
        let dir = setup_test_dir();
        let tool = RunCommand::new(dir.path().to_path_buf());

        let result = tool
            .execute(json!({ "command": "echo oops >&2; exit 3" }))
            .await
            .unwrap();
        assert_eq!(result["exit_code"], 3);
        assert_eq!(result["success"], false);
        assert_eq!(result["stderr"].as_str().unwrap().trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = setup_test_dir();
        let tool = RunCommand::new(dir.path().to_path_buf());

        let err = tool
            .execute(json!({ "command": "sleep 5", "timeout": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_blocked_command() {
        let dir = setup_test_dir();
        let config = ShellConfig {
            blocked_commands: vec!["forbidden".into()],
            ..ShellConfig::default()
        };
        let tool = RunCommand::new(dir.path().to_path_buf()).with_config(config);

        let err = tool
            .execute(json!({ "command": "echo forbidden" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
    }
}

mod process_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_processes() {
        let result = ManageProcesses.execute(json!({ "action": "list" })).await.unwrap();
        assert!(result["count"].as_u64().unwrap() >= 1);
        assert!(!result["processes"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_with_no_match() {
        let result = ManageProcesses
            .execute(json!({ "action": "find", "process_name": "no-such-process-x9q" }))
            .await
            .unwrap();
        assert_eq!(result["count"], 0);
    }

    #[tokio::test]
    async fn test_info_requires_pid() {
        let err = ManageProcesses.execute(json!({ "action": "info" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_unknown_action_rejected_by_registry() {
        let mut registry = toolloop_core::ToolRegistry::new();
        registry.register(Arc::new(ManageProcesses));
        let mut metrics = Metrics::new();

        let result = registry
            .dispatch(
                &ToolCall::new("manage_processes", args(json!({ "action": "restart" }))),
                &mut metrics,
            )
            .await;
        match result.outcome {
            ToolOutcome::Failure(message) => assert!(message.starts_with("Invalid parameters")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(metrics.tool_errors, 1);
    }
}

mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_all_keeps_order_despite_failures() {
        let dir = setup_test_dir();
        let registry = create_standard_tool_registry(dir.path().to_path_buf());
        let mut metrics = Metrics::new();

        let calls = vec![
            ToolCall::new("read_file", args(json!({ "file_path": "src/main.rs" }))),
            ToolCall::new("read_file", args(json!({ "file_path": "missing.rs" }))),
            ToolCall::new("no_such_tool", Map::new()),
            ToolCall::new("read_file", Map::new()),
            ToolCall::new("run_command", args(json!({ "command": "echo done" }))),
        ];

        let results = registry.dispatch_all(&calls, &mut metrics).await;
        assert_eq!(results.len(), calls.len());
        for (call, result) in calls.iter().zip(&results) {
            assert_eq!(call.id, result.call_id);
            assert_eq!(call.name, result.name);
        }

        let successes: Vec<bool> = results.iter().map(|r| r.is_success()).collect();
        assert_eq!(successes, vec![true, false, false, false, true]);
        assert_eq!(
            results[3].outcome,
            ToolOutcome::Failure("Invalid parameters: file_path is required".into())
        );

        assert_eq!(metrics.function_calls, 5);
        assert_eq!(metrics.tool_errors, 3);
        assert_eq!(metrics.tool_stats("read_file").unwrap().calls, 3);
        assert_eq!(metrics.tool_stats("read_file").unwrap().failures, 2);
    }

    #[tokio::test]
    async fn test_wrong_argument_type_is_rejected() {
        let dir = setup_test_dir();
        let registry = create_standard_tool_registry(dir.path().to_path_buf());
        let mut metrics = Metrics::new();

        let result = registry
            .dispatch(
                &ToolCall::new("list_files", args(json!({ "recursive": "yes" }))),
                &mut metrics,
            )
            .await;
        match result.outcome {
            ToolOutcome::Failure(message) => assert!(message.contains("recursive must be of type boolean")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_system_info_through_registry() {
        let mut registry = toolloop_core::ToolRegistry::new();
        registry.register(Arc::new(GetSystemInfo));
        let mut metrics = Metrics::new();

        let result = registry
            .dispatch(&ToolCall::new("get_system_info", Map::new()), &mut metrics)
            .await;
        match result.outcome {
            ToolOutcome::Success(value) => {
                assert!(value["memory"]["total"].is_u64());
                assert!(value["cpu"]["logical_cores"].is_u64());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_definitions_are_complete() {
        let dir = setup_test_dir();
        let registry = create_standard_tool_registry(dir.path().to_path_buf());
        for def in registry.list() {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }
}
