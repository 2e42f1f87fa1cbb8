//! Generation-retry-tool-dispatch loop
//!
//! One request runs as a bounded series of model round trips. Each round trip
//! calls the gateway (retrying transient failures with linear backoff), then
//! either dispatches the requested tool calls and feeds their results back,
//! returns the final text, or moves on after an empty response.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{defaults, Config};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::orchestration::{normalizer, MessageNormalizer};
use crate::provider::{
    GatewayError, GatewayMessage, Generation, GenerationRequest, GenerationResponse, ModelGateway,
};
use crate::tools::ToolRegistry;

use super::types::Message;

/// Returned when the iteration budget runs out without a final answer
pub const FALLBACK_RESPONSE: &str =
    "I couldn't generate a complete response. Please try rephrasing your request.";

/// Limits and generation parameters for one loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub max_iterations: usize,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub context_window: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_instruction: Option<String>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_delay: Duration::from_secs_f64(defaults::RETRY_DELAY_SECS),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            context_window: defaults::CONTEXT_WINDOW,
            temperature: defaults::TEMPERATURE,
            max_tokens: defaults::MAX_TOKENS,
            system_instruction: None,
        }
    }
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            retry_attempts: config.agent.retry_attempts,
            retry_delay: config.retry_delay(),
            request_timeout: config.request_timeout(),
            context_window: config.agent.context_window,
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// How a loop run ended
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model answered with text
    Completed { text: String, iterations: usize },
    /// Every iteration was spent on tool calls or empty responses
    Exhausted { text: String, iterations: usize },
}

impl LoopOutcome {
    pub fn text(&self) -> &str {
        match self {
            LoopOutcome::Completed { text, .. } | LoopOutcome::Exhausted { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            LoopOutcome::Completed { text, .. } | LoopOutcome::Exhausted { text, .. } => text,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            LoopOutcome::Completed { iterations, .. } | LoopOutcome::Exhausted { iterations, .. } => {
                *iterations
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoopOutcome::Exhausted { .. })
    }
}

/// The orchestrator: gateway, tools and limits for one agent
pub struct AgentLoop {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    normalizer: MessageNormalizer,
    settings: LoopSettings,
}

impl AgentLoop {
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>, settings: LoopSettings) -> Self {
        Self {
            gateway,
            tools,
            normalizer: MessageNormalizer::new(settings.context_window),
            settings,
        }
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Run one request. `history` is the session before `input` was added.
    ///
    /// Gateway failures that survive the retry policy abort the request with
    /// [`Error::Gateway`]; tool failures never do.
    pub async fn run(
        &self,
        history: &[Message],
        input: &str,
        metrics: &mut Metrics,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome> {
        let mut messages = self.normalizer.normalize(history, input);
        let tools = self.tools.list();

        info!(
            gateway = self.gateway.name(),
            history = history.len(),
            messages = messages.len(),
            tools = tools.len(),
            "Starting generation loop"
        );

        for iteration in 1..=self.settings.max_iterations {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let request = GenerationRequest {
                messages: normalizer::validate(messages.clone()),
                tools: tools.clone(),
                system_instruction: self.settings.system_instruction.clone(),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
            };

            let response = self.call_with_retry(&request, iteration, cancel).await?;
            metrics.record_usage(&response.usage);

            if let Some(message) = response.generation.to_message() {
                messages.push(message);
            }

            match response.generation {
                Generation::ToolCalls { calls, text } => {
                    if text.is_some() {
                        debug!(iteration, "Text alongside tool calls is not treated as final");
                    }
                    info!(iteration, count = calls.len(), "Dispatching tool calls");
                    let results = self.tools.dispatch_all(&calls, metrics).await;
                    messages.push(GatewayMessage::tool_results(results));
                }
                Generation::Text(text) => {
                    info!(iteration, "Generation loop completed");
                    return Ok(LoopOutcome::Completed { text, iterations: iteration });
                }
                Generation::Empty => {
                    warn!(iteration, "Model returned neither text nor tool calls");
                }
            }
        }

        warn!(
            max_iterations = self.settings.max_iterations,
            "Iteration budget exhausted without a final answer"
        );
        Ok(LoopOutcome::Exhausted {
            text: FALLBACK_RESPONSE.to_string(),
            iterations: self.settings.max_iterations,
        })
    }

    /// Call the gateway, retrying transient failures.
    ///
    /// Attempt `n` (1-based) that fails transiently waits `retry_delay * n`
    /// before the next one. Both the call and the wait give way to `cancel`.
    async fn call_with_retry(
        &self,
        request: &GenerationRequest,
        iteration: usize,
        cancel: &CancellationToken,
    ) -> Result<GenerationResponse> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(iteration, attempt, attempts, "Calling model gateway");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = tokio::time::timeout(self.settings.request_timeout, self.gateway.generate(request)) => {
                    result.unwrap_or_else(|_| {
                        Err(GatewayError::Transient(format!(
                            "request timed out after {:?}",
                            self.settings.request_timeout
                        )))
                    })
                }
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.settings.retry_delay * attempt as u32;
                    warn!(
                        iteration,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient gateway failure, retrying: {}",
                        e
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!(iteration, attempt, transient = e.is_transient(), "Gateway call failed: {}", e);
                    return Err(Error::Gateway(e));
                }
            }
        }
    }
}
