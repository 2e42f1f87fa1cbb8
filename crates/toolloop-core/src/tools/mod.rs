//! Tool system for the generation loop
//!
//! Tools are the actions the model can request. Each tool has:
//! - A name and description for the model
//! - A JSON schema for parameters
//! - An execute method
//!
//! The [`ToolRegistry`] owns the name → tool mapping and turns every
//! [`ToolCall`] into exactly one [`ToolResult`], whatever the tool does.

pub mod filesystem;
pub mod schema;
pub mod shell;
pub mod system;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::metrics::Metrics;

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tool definition for model consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by the model to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given parameters
    fn execute(&self, params: Value) -> BoxFuture<'_, Result<Value, ToolError>>;

    /// Convert to tool definition for the model
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A model's request to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Outcome of a single dispatch: a value or an error string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolOutcome {
    #[serde(rename = "result")]
    Success(Value),
    #[serde(rename = "error")]
    Failure(String),
}

/// The answer to a [`ToolCall`], fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(call: &ToolCall, value: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Success(value),
        }
    }

    pub fn failure(call: &ToolCall, message: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            outcome: ToolOutcome::Failure(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// `{"result": ...}` or `{"error": "..."}`, the shape sent back to the model.
    pub fn payload(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(value) => serde_json::json!({ "result": value }),
            ToolOutcome::Failure(message) => serde_json::json!({ "error": message }),
        }
    }
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all available tools, sorted by name
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one call. Never fails: unknown tools, invalid arguments,
    /// tool errors and panics all come back as a failure result.
    pub async fn dispatch(&self, call: &ToolCall, metrics: &mut Metrics) -> ToolResult {
        let start = Instant::now();
        let result = self.dispatch_inner(call).await;
        let elapsed = start.elapsed();

        match &result.outcome {
            ToolOutcome::Success(_) => {
                info!(tool = %call.name, call_id = %call.id, elapsed_ms = elapsed.as_millis() as u64, "Tool call succeeded");
            }
            ToolOutcome::Failure(message) => {
                warn!(tool = %call.name, call_id = %call.id, error = %message, "Tool call failed");
            }
        }
        metrics.record_tool_call(&call.name, elapsed, result.is_success());
        result
    }

    async fn dispatch_inner(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            return ToolResult::failure(call, ToolError::NotFound(call.name.clone()).to_string());
        };

        if let Err(e) = schema::validate_arguments(&tool.parameters_schema(), &call.arguments) {
            return ToolResult::failure(call, ToolError::InvalidParams(e).to_string());
        }

        debug!(tool = %call.name, args = ?call.arguments, "Executing tool");
        let params = Value::Object(call.arguments.clone());
        match AssertUnwindSafe(tool.execute(params)).catch_unwind().await {
            Ok(Ok(value)) => ToolResult::success(call, value),
            Ok(Err(e)) => ToolResult::failure(call, e.to_string()),
            Err(_) => ToolResult::failure(call, format!("Tool '{}' panicked", call.name)),
        }
    }

    /// Dispatch calls one after another; results keep the order of `calls`.
    pub async fn dispatch_all(&self, calls: &[ToolCall], metrics: &mut Metrics) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(call, metrics).await);
        }
        results
    }
}
