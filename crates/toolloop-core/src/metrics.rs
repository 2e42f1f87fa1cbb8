//! Request, token and tool-call accounting
//!
//! One [`Metrics`] value lives inside each agent and is only mutated on the
//! request path, so it needs no synchronization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::provider::TokenUsage;

/// Per-tool breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolStats {
    pub calls: u64,
    pub failures: u64,
    pub total_duration_secs: f64,
}

impl ToolStats {
    pub fn average_duration_secs(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_duration_secs / self.calls as f64
        }
    }
}

/// Running counters for one agent
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_tokens: u64,
    pub function_calls: u64,
    /// Failed tool dispatches
    pub tool_errors: u64,
    /// Mean latency of successful requests, in seconds
    pub average_response_time: f64,
    tools: BTreeMap<String, ToolStats>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished request. Only successful requests feed the average.
    pub fn record_request(&mut self, elapsed: Duration, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
            let n = self.successful_requests as f64;
            self.average_response_time += (elapsed.as_secs_f64() - self.average_response_time) / n;
        } else {
            self.failed_requests += 1;
        }
    }

    pub fn record_usage(&mut self, usage: &TokenUsage) {
        self.total_tokens += usage.total();
    }

    pub fn record_tool_call(&mut self, name: &str, elapsed: Duration, success: bool) {
        self.function_calls += 1;
        let stats = self.tools.entry(name.to_string()).or_default();
        stats.calls += 1;
        stats.total_duration_secs += elapsed.as_secs_f64();
        if !success {
            stats.failures += 1;
            self.tool_errors += 1;
        }
    }

    pub fn tool_stats(&self, name: &str) -> Option<&ToolStats> {
        self.tools.get(name)
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            total_tokens: self.total_tokens,
            function_calls: self.function_calls,
            tool_errors: self.tool_errors,
            average_response_time: self.average_response_time,
            success_rate: self.success_rate(),
            tools: self.tools.clone(),
            exported_at: chrono::Utc::now(),
        }
    }

    /// Write a snapshot as pretty JSON, creating parent directories.
    pub fn export(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Point-in-time, serializable copy of [`Metrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_tokens: u64,
    pub function_calls: u64,
    pub tool_errors: u64,
    pub average_response_time: f64,
    pub success_rate: f64,
    pub tools: BTreeMap<String, ToolStats>,
    pub exported_at: chrono::DateTime<chrono::Utc>,
}
