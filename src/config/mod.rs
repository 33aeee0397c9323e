pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

use self::validation::validate_config;
use crate::protocol::server_tools::ServerToolRule;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// What a session does with a payload it cannot decode for a known event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPayloadPolicy {
    /// Terminate the session with [`crate::error::StreamError::MalformedEvent`].
    #[default]
    Fatal,
    /// Log at warn and move on to the next event.
    Skip,
}

impl fmt::Display for MalformedPayloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPayloadPolicy::Fatal => write!(f, "fatal"),
            MalformedPayloadPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub malformed_payloads: MalformedPayloadPolicy,
    /// Missing => 16 MiB, explicit null => unbounded.
    #[serde(default = "default_max_tool_buffer_bytes")]
    pub max_tool_buffer_bytes: Option<usize>,
    /// Extra or replacement server tool rules layered over the built-in table.
    #[serde(default)]
    pub server_tools: Vec<ServerToolRule>,
}

fn default_max_tool_buffer_bytes() -> Option<usize> {
    Some(16 * 1024 * 1024)
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            malformed_payloads: MalformedPayloadPolicy::default(),
            max_tool_buffer_bytes: default_max_tool_buffer_bytes(),
            server_tools: Vec::new(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Load and validate configuration from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or fails validation.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError`] when the text cannot be parsed or fails validation.
pub fn load_config_from_str(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}
