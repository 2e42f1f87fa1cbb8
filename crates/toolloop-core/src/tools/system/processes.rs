//! Process management tool

use serde_json::{json, Value};
use sysinfo::{Pid, Process, Signal, System};

use crate::error::ToolError;
use crate::tools::{BoxFuture, Tool};

use super::blocking;

/// Cap on processes returned by `list`
const LIST_LIMIT: usize = 50;

/// Lists, finds, inspects and signals processes
pub struct ManageProcesses;

fn process_summary(process: &Process) -> Value {
    json!({
        "pid": process.pid().as_u32(),
        "name": process.name().to_string_lossy(),
        "status": process.status().to_string(),
        "cpu_percent": process.cpu_usage(),
        "memory": process.memory(),
    })
}

fn process_detail(process: &Process) -> Value {
    let cmdline: Vec<String> = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy().to_string())
        .collect();
    json!({
        "pid": process.pid().as_u32(),
        "name": process.name().to_string_lossy(),
        "status": process.status().to_string(),
        "parent_pid": process.parent().map(|p| p.as_u32()),
        "exe": process.exe().map(|p| p.display().to_string()),
        "cmdline": cmdline,
        "start_time": process.start_time(),
        "run_time_secs": process.run_time(),
        "cpu_percent": process.cpu_usage(),
        "memory": process.memory(),
        "virtual_memory": process.virtual_memory(),
    })
}

fn parse_signal(name: &str) -> Result<Signal, ToolError> {
    match name.to_uppercase().as_str() {
        "TERM" => Ok(Signal::Term),
        "KILL" => Ok(Signal::Kill),
        "INT" => Ok(Signal::Interrupt),
        other => Err(ToolError::InvalidParams(format!("Unsupported signal: {}", other))),
    }
}

fn require_pid(params: &Value) -> Result<u32, ToolError> {
    params["pid"]
        .as_u64()
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(|| ToolError::InvalidParams("pid is required for this action".into()))
}

fn run(params: Value) -> Result<Value, ToolError> {
    let action = params["action"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidParams("action is required".into()))?;

    let sys = System::new_all();

    match action {
        "list" => {
            let mut processes: Vec<&Process> = sys.processes().values().collect();
            processes.sort_by_key(|p| p.pid().as_u32());
            let listed: Vec<Value> = processes.iter().take(LIST_LIMIT).map(|p| process_summary(p)).collect();
            Ok(json!({
                "action": "list",
                "count": processes.len(),
                "processes": listed,
            }))
        }
        "find" => {
            let needle = params["process_name"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidParams("process_name is required for find".into()))?
                .to_lowercase();
            let matching: Vec<Value> = sys
                .processes()
                .values()
                .filter(|p| p.name().to_string_lossy().to_lowercase().contains(&needle))
                .map(process_summary)
                .collect();
            Ok(json!({
                "action": "find",
                "search_term": needle,
                "count": matching.len(),
                "processes": matching,
            }))
        }
        "info" => {
            let pid = require_pid(&params)?;
            let process = sys
                .process(Pid::from_u32(pid))
                .ok_or_else(|| ToolError::ResourceNotFound(format!("Process {} not found", pid)))?;
            Ok(json!({ "action": "info", "process": process_detail(process) }))
        }
        "kill" => {
            let pid = require_pid(&params)?;
            let signal = parse_signal(params["signal_type"].as_str().unwrap_or("TERM"))?;

            if sysinfo::get_current_pid().ok() == Some(Pid::from_u32(pid)) {
                return Err(ToolError::PermissionDenied("Refusing to signal the agent's own process".into()));
            }

            let process = sys
                .process(Pid::from_u32(pid))
                .ok_or_else(|| ToolError::ResourceNotFound(format!("Process {} not found", pid)))?;
            match process.kill_with(signal) {
                Some(true) => Ok(json!({
                    "action": "kill",
                    "pid": pid,
                    "signal": format!("{:?}", signal),
                    "success": true,
                })),
                Some(false) => Err(ToolError::ExecutionFailed(format!("Failed to signal process {}", pid))),
                None => Err(ToolError::ExecutionFailed(format!(
                    "Signal {:?} is not supported on this platform",
                    signal
                ))),
            }
        }
        other => Err(ToolError::InvalidParams(format!("Unknown action: {}", other))),
    }
}

impl Tool for ManageProcesses {
    fn name(&self) -> &str {
        "manage_processes"
    }

    fn description(&self) -> &str {
        "List running processes, find them by name, show details for a PID, or send a signal to a PID."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "find", "info", "kill"],
                    "description": "What to do"
                },
                "process_name": {
                    "type": "string",
                    "description": "Substring of the process name (for find)"
                },
                "pid": {
                    "type": "integer",
                    "description": "Process ID (for info and kill)"
                },
                "signal_type": {
                    "type": "string",
                    "enum": ["TERM", "KILL", "INT"],
                    "description": "Signal to send (for kill, default TERM)",
                    "default": "TERM"
                }
            },
            "required": ["action"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move { blocking(move || run(params)).await })
    }
}
