//! Configuration loading, validation, and management for agentloop.
//!
//! Loads configuration from `~/.agentloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Loop and memory limits shared by all agents
    #[serde(default)]
    pub agent: AgentDefaults,

    /// Endpoint retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Keyword routing
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-agent overrides, keyed by agent type ("general", "math", ...)
    #[serde(default)]
    pub agents: HashMap<String, AgentOverride>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("retry", &self.retry)
            .field("routing", &self.routing)
            .field("agents", &self.agents)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Completion round-trips allowed per user input
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Messages kept in each agent's history
    #[serde(default = "default_memory_size")]
    pub memory_size: usize,
}

fn default_max_turns() -> u32 {
    8
}
fn default_memory_size() -> usize {
    50
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            memory_size: default_memory_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt, transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8000
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Score given to the general agent regardless of the query
    #[serde(default = "default_fallback_score")]
    pub fallback_score: f64,

    /// Raw score at which a specialist reaches 0.5
    #[serde(default = "default_saturation")]
    pub saturation: f64,

    /// Extra patterns appended to the built-in tables, keyed by agent type
    #[serde(default)]
    pub keywords: HashMap<String, Vec<KeywordConfig>>,
}

fn default_fallback_score() -> f64 {
    0.5
}
fn default_saturation() -> f64 {
    1.0
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fallback_score: default_fallback_score(),
            saturation: default_saturation(),
            keywords: HashMap::new(),
        }
    }
}

/// A keyword pattern (regular expression) and the weight it contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    pub pattern: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
}

/// Agent types the routing and override tables may name.
pub const AGENT_TYPES: [&str; 4] = ["general", "math", "research", "code"];

impl AppConfig {
    /// Load configuration from the default path (~/.agentloop/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `AGENTLOOP_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("AGENTLOOP_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("AGENTLOOP_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("AGENTLOOP_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentloop")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_turns < 1 {
            return Err(ConfigError::ValidationError("agent.max_turns must be at least 1".into()));
        }

        if self.agent.memory_size < 2 {
            return Err(ConfigError::ValidationError(
                "agent.memory_size must be at least 2".into(),
            ));
        }

        if !(self.routing.fallback_score > 0.0 && self.routing.fallback_score < 1.0) {
            return Err(ConfigError::ValidationError(
                "routing.fallback_score must be between 0.0 and 1.0 (exclusive)".into(),
            ));
        }

        if self.routing.saturation <= 0.0 {
            return Err(ConfigError::ValidationError("routing.saturation must be > 0".into()));
        }

        for (agent_type, keywords) in &self.routing.keywords {
            check_agent_type(agent_type, "routing.keywords")?;
            if agent_type == "general" {
                return Err(ConfigError::ValidationError(
                    "routing.keywords: the general agent is scored by fallback_score, not keywords"
                        .into(),
                ));
            }
            for kw in keywords {
                if !(kw.weight > 0.0 && kw.weight.is_finite()) {
                    return Err(ConfigError::ValidationError(format!(
                        "routing.keywords.{agent_type}: weight for '{}' must be > 0",
                        kw.pattern
                    )));
                }
                regex_lite::Regex::new(&kw.pattern).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "routing.keywords.{agent_type}: invalid pattern '{}': {e}",
                        kw.pattern
                    ))
                })?;
            }
        }

        for (agent_type, over) in &self.agents {
            check_agent_type(agent_type, "agents")?;
            if over.max_turns == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "agents.{agent_type}.max_turns must be at least 1"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn check_agent_type(name: &str, section: &str) -> Result<(), ConfigError> {
    if AGENT_TYPES.contains(&name) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{section}: unknown agent type '{name}' (expected one of {})",
            AGENT_TYPES.join(", ")
        )))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            agent: AgentDefaults::default(),
            retry: RetryConfig::default(),
            routing: RoutingConfig::default(),
            agents: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
