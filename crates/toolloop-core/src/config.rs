//! Configuration management for toolloop
//!
//! Handles loading, saving and validating the TOML configuration: model
//! settings, loop limits, history storage and logging.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default values shared by config structs and docs
pub mod defaults {
    pub const MODEL: &str = "gemini-2.0-flash-001";
    pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
    pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";
    pub const MAX_ITERATIONS: usize = 30;
    pub const MAX_TOKENS: u32 = 8192;
    pub const TEMPERATURE: f32 = 0.7;
    pub const RETRY_ATTEMPTS: usize = 3;
    pub const RETRY_DELAY_SECS: f64 = 1.0;
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
    pub const CONTEXT_WINDOW: usize = 10;
    pub const PRELOAD_SESSIONS: usize = 10;
    pub const COMMAND_TIMEOUT_SECS: u64 = 60;
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Model gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    /// Explicit API key; never written back to disk
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: defaults::MODEL.to_string(),
            api_key: None,
            api_key_env: defaults::API_KEY_ENV.to_string(),
            temperature: defaults::TEMPERATURE,
            max_tokens: defaults::MAX_TOKENS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Generation loop limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model round trips per request
    pub max_iterations: usize,
    /// Gateway attempts per round trip
    pub retry_attempts: usize,
    /// Base backoff; attempt `n` waits `retry_delay_secs * (n + 1)`
    pub retry_delay_secs: f64,
    /// History messages sent with each request
    pub context_window: usize,
    /// Directory tools operate in; defaults to the current directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Template with `{working_dir}` and `{available_tools}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_template: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_delay_secs: defaults::RETRY_DELAY_SECS,
            context_window: defaults::CONTEXT_WINDOW,
            working_dir: None,
            system_prompt_template: None,
        }
    }
}

/// Session history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Persist sessions to disk
    pub enabled: bool,
    /// Root for sessions and exported metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Recent sessions loaded at startup
    pub preload_sessions: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: None,
            preload_sessions: defaults::PRELOAD_SESSIONS,
        }
    }
}

/// Which built-in tool groups are registered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub filesystem: bool,
    pub shell: bool,
    pub system: bool,
    pub command_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            filesystem: true,
            shell: true,
            system: true,
            command_timeout_secs: defaults::COMMAND_TIMEOUT_SECS,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Also write logs to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations < 1 {
            return Err(Error::Config("max_iterations must be at least 1".into()));
        }
        if self.agent.retry_attempts < 1 {
            return Err(Error::Config("retry_attempts must be at least 1".into()));
        }
        if !self.agent.retry_delay_secs.is_finite() || self.agent.retry_delay_secs < 0.0 {
            return Err(Error::Config("retry_delay_secs must be a non-negative number".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(Error::Config("temperature must be between 0 and 2".into()));
        }
        if self.model.request_timeout_secs < 1 {
            return Err(Error::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.model.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".into()));
        }
        Ok(())
    }

    /// Explicit key, then the configured env var, then the Gemini defaults
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.model.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        [
            self.model.api_key_env.as_str(),
            defaults::API_KEY_ENV,
            defaults::FALLBACK_API_KEY_ENV,
        ]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
    }

    pub fn working_dir(&self) -> PathBuf {
        self.agent
            .working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.history.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("toolloop"))
                .unwrap_or_else(|| PathBuf::from(".toolloop"))
        })
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir().join("sessions")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir().join("metrics.json")
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.agent.retry_delay_secs.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.request_timeout_secs)
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("toolloop").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model.model, "gemini-2.0-flash-001");
        assert_eq!(config.agent.max_iterations, 30);
        assert_eq!(config.agent.retry_attempts, 3);
        assert_eq!(config.agent.context_window, 10);
        assert_eq!(config.model.max_tokens, 8192);
        assert!(config.history.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_key_wins() {
        let mut config = Config::default();
        config.model.api_key = Some("explicit".into());
        assert_eq!(config.resolve_api_key().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.model.api_key = Some("secret".into());
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(!toml.contains("secret"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[agent]\nmax_iterations = 5\n").unwrap();
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.retry_attempts, 3);
        assert_eq!(config.model.model, "gemini-2.0-flash-001");
    }
}
