//! Service configuration
//!
//! Layers, lowest precedence first: built-in defaults, a TOML or YAML file,
//! `CERTWATCH_*` environment variables. Command-line flags are applied on
//! top by the binary. The result is validated once all layers are in.

use certwatch_core::{MessageKey, TemplateLocalizer, TlsSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Config file extensions `CertwatchConfig::load` understands
pub const CONFIG_EXTENSIONS: &str = ".toml, .yaml or .yml";

pub const ENV_HOST: &str = "CERTWATCH_HOST";
pub const ENV_PORT: &str = "CERTWATCH_PORT";
pub const ENV_EXPIRATION_THRESHOLD_DAYS: &str = "CERTWATCH_EXPIRATION_THRESHOLD_DAYS";
pub const ENV_AGE_THRESHOLD_DAYS: &str = "CERTWATCH_AGE_THRESHOLD_DAYS";
pub const ENV_LOG_LEVEL: &str = "CERTWATCH_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "CERTWATCH_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5601,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Files the static sources are loaded from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub certificates: Option<PathBuf>,
    pub monitors: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertwatchConfig {
    pub server: ServerConfig,
    pub tls: TlsSettings,
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    /// Message template overrides keyed by message key
    pub messages: HashMap<MessageKey, String>,
}

impl CertwatchConfig {
    /// Parse a config file, choosing the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    expected: CONFIG_EXTENSIONS,
                })
            }
        };

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Defaults or `path`, then environment overrides, then validation
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CERTWATCH_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = parse_var(ENV_PORT, &port)?;
        }
        if let Some(days) = lookup(ENV_EXPIRATION_THRESHOLD_DAYS) {
            self.tls.expiration_threshold_days = parse_var(ENV_EXPIRATION_THRESHOLD_DAYS, &days)?;
        }
        if let Some(days) = lookup(ENV_AGE_THRESHOLD_DAYS) {
            self.tls.age_threshold_days = parse_var(ENV_AGE_THRESHOLD_DAYS, &days)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(json) = lookup(ENV_LOG_JSON) {
            self.logging.json = parse_var(ENV_LOG_JSON, &json)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".to_string()));
        }
        self.tls
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("tls: {}", e)))?;
        Ok(())
    }

    /// English templates with this config's overrides applied
    pub fn localizer(&self) -> TemplateLocalizer {
        TemplateLocalizer::english().with_overrides(self.messages.clone())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{}='{}': {}", name, value, e)))
}
