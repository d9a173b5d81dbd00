//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BlogConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BlogConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, |var| std::env::var(var).ok())
}

/// Load from `path` if it exists, otherwise start from defaults.
pub fn load_or_default(path: &Path) -> Result<BlogConfig, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        parse_config("", |var| std::env::var(var).ok())
    }
}

/// Parse TOML, apply environment overrides, validate.
pub fn parse_config<F>(content: &str, env: F) -> Result<BlogConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: BlogConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut BlogConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("DATABASE_URL").filter(|v| !v.is_empty()) {
        config.database.url = Some(url);
    }
    if let Some(addr) = env("BLOG_BIND_ADDRESS").filter(|v| !v.is_empty()) {
        config.listener.bind_address = addr;
    }
    if let Some(raw) = env("BLOG_ENV").filter(|v| !v.is_empty()) {
        config.environment = raw.parse().map_err(|message| ConfigError::Env {
            var: "BLOG_ENV",
            message,
        })?;
    }
    Ok(())
}
