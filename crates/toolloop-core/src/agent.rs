//! Agent facade
//!
//! Ties the loop, the conversation manager and the metrics together behind
//! the request API used by the CLI.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::orchestration::{SystemPrompt, ToolRegistryBuilder};
use crate::provider::{GenAIProvider, ModelGateway};
use crate::session::{
    AgentLoop, ConversationManager, ExportFormat, FileSessionStore, LoopOutcome, LoopSettings,
    MemorySessionStore, Message, SearchHit, Session, SessionStatistics, SessionStore,
    DEFAULT_SEARCH_LIMIT,
};
use crate::tools::{ToolDefinition, ToolRegistry};

pub struct Agent {
    config: Config,
    agent_loop: AgentLoop,
    conversations: ConversationManager,
    metrics: Metrics,
}

impl Agent {
    /// Build an agent with the genai gateway, the file store (or an in-memory
    /// one when history is off) and the configured built-in tools.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::Config(format!(
                "No API key found. Set {} or add api_key to the [model] section",
                config.model.api_key_env
            ))
        })?;
        let gateway: Arc<dyn ModelGateway> = Arc::new(GenAIProvider::with_api_key(
            config.model.model.clone(),
            &api_key,
            config.request_timeout(),
        ));

        let store: Arc<dyn SessionStore> = if config.history.enabled {
            Arc::new(FileSessionStore::new(config.sessions_dir()))
        } else {
            Arc::new(MemorySessionStore::new())
        };

        let tools = ToolRegistryBuilder::new(config.working_dir())
            .with_config(&config.tools)
            .build();

        Ok(Self::new(config, gateway, store, tools))
    }

    /// Build an agent from explicit parts
    pub fn new(
        config: Config,
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn SessionStore>,
        tools: ToolRegistry,
    ) -> Self {
        let prompt = match &config.agent.system_prompt_template {
            Some(template) => SystemPrompt::with_template(template.clone()),
            None => SystemPrompt::new(),
        }
        .with_working_dir(&config.working_dir())
        .with_tools(tools.list().into_iter().map(|d| d.name));

        let settings = LoopSettings::from_config(&config).with_system_instruction(prompt.build());
        let agent_loop = AgentLoop::new(gateway, Arc::new(tools), settings);

        let preload = if config.history.enabled {
            config.history.preload_sessions
        } else {
            0
        };
        let conversations = ConversationManager::with_preload(store, preload);

        info!(
            gateway = agent_loop.gateway_name(),
            tools = agent_loop.tools().len(),
            history = config.history.enabled,
            "Agent initialized"
        );

        Self {
            config,
            agent_loop,
            conversations,
            metrics: Metrics::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one request without cancellation
    pub async fn submit(&mut self, input: &str, context: Option<Map<String, Value>>) -> Result<String> {
        self.submit_with_cancel(input, context, &CancellationToken::new())
            .await
    }

    /// Process one request.
    ///
    /// Gateway failures come back as `Ok` with an apology text that is also
    /// recorded in the session; only cancellation is returned as an error.
    /// `context` is stored as metadata on the user message.
    pub async fn submit_with_cancel(
        &mut self,
        input: &str,
        context: Option<Map<String, Value>>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let started = Instant::now();

        let history: Vec<Message> = if self.config.history.enabled {
            self.conversations
                .current()
                .map(|s| s.context_window(self.agent_loop.settings().context_window).to_vec())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut user_message = Message::user(input);
        for (key, value) in context.into_iter().flatten() {
            user_message = user_message.with_metadata(key, value);
        }
        let session_id = self.conversations.append(user_message).id.clone();
        info!(session_id = %session_id, input_len = input.len(), "Processing request");

        let result = self
            .agent_loop
            .run(&history, input, &mut self.metrics, cancel)
            .await;

        let reply = match result {
            Ok(outcome) => {
                if let LoopOutcome::Exhausted { iterations, .. } = &outcome {
                    warn!(session_id = %session_id, iterations, "Returning fallback response");
                }
                self.metrics.record_request(started.elapsed(), true);
                let text = outcome.into_text();
                self.conversations.append(Message::assistant(text.clone()));
                Ok(text)
            }
            Err(Error::Cancelled) => {
                info!(session_id = %session_id, "Request cancelled");
                self.metrics.record_request(started.elapsed(), false);
                Err(Error::Cancelled)
            }
            Err(e) => {
                error!(session_id = %session_id, "Request failed: {}", e);
                self.metrics.record_request(started.elapsed(), false);
                let text = format!("I encountered an error: {}. Please try again.", e);
                self.conversations
                    .append(Message::assistant(text.clone()).with_metadata("error", e.to_string()));
                Ok(text)
            }
        };

        if self.config.history.enabled {
            if let Err(e) = self.conversations.save(&session_id) {
                warn!(session_id = %session_id, "Failed to save session: {}", e);
            }
        }

        reply
    }

    /// Start a fresh session; the previous one is saved first.
    pub fn reset(&mut self) -> &Session {
        if self.config.history.enabled {
            if let Err(e) = self.conversations.save_current() {
                warn!("Failed to save session before reset: {}", e);
            }
        }
        self.conversations.create_session()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.conversations.current()
    }

    /// Make a stored session current
    pub fn resume(&mut self, session_id: &str) -> Result<&Session> {
        self.conversations.resume(session_id)
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.conversations.search(query, DEFAULT_SEARCH_LIMIT)
    }

    /// Export a session; `None` exports the current one
    pub fn export(&mut self, session_id: Option<&str>, format: ExportFormat) -> Result<String> {
        self.conversations.export(session_id, format)
    }

    pub fn statistics(&self) -> Result<SessionStatistics> {
        self.conversations.statistics()
    }

    pub fn clear_old_sessions(&mut self, days: u32) -> Result<usize> {
        self.conversations.clear_old_sessions(days)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.agent_loop.tools().list()
    }

    /// Persist the current session
    pub fn save(&self) -> Result<()> {
        self.conversations.save_current()
    }

    /// Save the current session and export metrics to the data directory
    pub fn shutdown(&self) -> Result<()> {
        if self.config.history.enabled {
            self.save()?;
        }
        let path = self.config.metrics_path();
        self.metrics.export(&path)?;
        info!(path = %path.display(), "Agent shut down");
        Ok(())
    }
}
