//! Configuration loading and validation for toolchat.
//!
//! Loads configuration from `~/.toolchat/config.toml` with environment
//! variable overrides for API credentials. All values are plain data:
//! constructed once, injected into the engine and prompt composer, no
//! ambient singletons.

pub mod prompts;

pub use prompts::PromptTemplates;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.toolchat/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// API endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Command-iteration engine options
    #[serde(default)]
    pub engine: EngineConfig,

    /// Tool plug-in source locators (paths to server descriptors)
    #[serde(default)]
    pub tool_sources: Vec<String>,

    /// User-authored base system prompt; the built-in default is used
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// API endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key. Falls back to DEEPSEEK_API_KEY / OPENAI_API_KEY /
    /// ANTHROPIC_API_KEY environment variables when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_base() -> String {
    "https://api.deepseek.com".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

/// Options for the command-iteration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Literal prefix identifying a reply line as a tool invocation
    #[serde(default = "default_command_start")]
    pub command_start: String,

    /// Delimiter between function name and arguments. Multi-byte by
    /// default to avoid collisions with natural-language punctuation.
    #[serde(default = "default_command_separator")]
    pub command_separator: String,

    /// Hard cap on loop continuations per user request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Sampling temperature; omitted from requests when unset
    #[serde(default = "default_temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Token cap per reply; omitted when unset
    #[serde(default = "default_max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling; omitted when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences; omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Streamed delivery by default
    #[serde(default = "default_true")]
    pub stream: bool,

    /// Which registered tools the prompt composer advertises. None
    /// means all. Advisory only; dispatch still resolves any
    /// registered name the model asks for explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_tools: Option<BTreeSet<String>>,

    /// Remove a failed command attempt (assistant turn + result prompt)
    /// from history before asking the model to retry
    #[serde(default = "default_true")]
    pub prune_failed_commands: bool,
}

fn default_command_start() -> String {
    "YLDEXECUTE:".into()
}
fn default_command_separator() -> String {
    "￥|".into()
}
fn default_max_iterations() -> u32 {
    15
}
fn default_temperature() -> Option<f32> {
    Some(1.0)
}
fn default_max_tokens() -> Option<u32> {
    Some(2048)
}
fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_start: default_command_start(),
            command_separator: default_command_separator(),
            max_iterations: default_max_iterations(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            stop: Vec::new(),
            presence_penalty: None,
            frequency_penalty: None,
            stream: true,
            enabled_tools: None,
            prune_failed_commands: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolchat/config.toml).
    ///
    /// API key environment fallbacks, in priority order:
    /// `DEEPSEEK_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api.api_key.is_none() {
            config.api.api_key = std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("TOOLCHAT_MODEL") {
            config.api.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file is
    /// not an error; defaults apply.
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
        dirs_home().join(".toolchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.engine.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "engine.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.engine.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_iterations must be at least 1".into(),
            ));
        }

        if self.engine.command_start.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.command_start must not be empty".into(),
            ));
        }

        if self.engine.command_separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.command_separator must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api.api_key.is_some()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.engine.command_start, "YLDEXECUTE:");
        assert_eq!(config.engine.command_separator, "￥|");
        assert_eq!(config.engine.max_iterations, 15);
        assert!(config.engine.stream);
        assert!(config.engine.prune_failed_commands);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.model, config.api.model);
        assert_eq!(parsed.engine.max_iterations, config.engine.max_iterations);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.engine.temperature = Some(5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.engine.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_separator_rejected() {
        let mut config = AppConfig::default();
        config.engine.command_separator = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.api.model, "deepseek-chat");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[engine]
max_iterations = 3

[api]
model = "gpt-4o"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.max_iterations, 3);
        assert_eq!(config.engine.command_start, "YLDEXECUTE:");
        assert_eq!(config.api.model, "gpt-4o");
        assert_eq!(config.api.api_base, "https://api.deepseek.com");
    }

    #[test]
    fn enabled_tools_parse() {
        let toml_str = r#"
[engine]
enabled_tools = ["ls", "get_system_info"]
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let enabled = config.engine.enabled_tools.unwrap();
        assert!(enabled.contains("ls"));
        assert!(!enabled.contains("rm"));
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let config = ApiConfig {
            api_key: Some("sk-secret".into()),
            ..ApiConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn malformed_config_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
