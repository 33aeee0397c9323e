use std::collections::HashSet;

use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_log_level(config)?;
    validate_buffer_limit(config)?;
    validate_server_tools(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    if !VALID_LOG_LEVELS.contains(&config.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {VALID_LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

fn validate_buffer_limit(config: &AppConfig) -> Result<(), ConfigError> {
    if config.decoder.max_tool_buffer_bytes == Some(0) {
        return Err(validation_err(
            "decoder.max_tool_buffer_bytes must be greater than 0 when set",
        ));
    }
    Ok(())
}

fn validate_server_tools(config: &AppConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for rule in &config.decoder.server_tools {
        if rule.raw_name.trim().is_empty() {
            return Err(validation_err("decoder.server_tools contains an empty raw_name"));
        }
        if rule.public_name.trim().is_empty() {
            return Err(validation_err(format!(
                "decoder.server_tools entry '{}' has an empty public_name",
                rule.raw_name
            )));
        }
        if !seen.insert(rule.raw_name.as_str()) {
            return Err(validation_err(format!(
                "decoder.server_tools lists '{}' more than once",
                rule.raw_name
            )));
        }
    }
    Ok(())
}
