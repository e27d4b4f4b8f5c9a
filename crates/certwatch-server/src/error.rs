//! Error types for startup registration, configuration and rule execution

use std::path::PathBuf;
use thiserror::Error;

/// A host collaborator refused a registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Something is already registered under the same key
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The host rejected the definition
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Fatal startup errors raised while wiring routes and rules into the host
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The route manifest uses a method the host router cannot register
    #[error("Handler for method {method} is not defined (route {path})")]
    UnsupportedMethod { method: String, path: String },

    /// The same method and path appear twice in the route manifest
    #[error("Duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// A route path that the host cannot mount
    #[error("Invalid route path '{0}': paths must start with '/'")]
    InvalidPath(String),

    /// A rule definition failed validation before reaching the host
    #[error("Malformed rule '{id}': {reason}")]
    MalformedRule { id: String, reason: String },

    /// The host rejected a registration
    #[error("Host rejected registration: {0}")]
    Host(#[from] HostError),
}

impl RegistrationError {
    pub fn malformed_rule(id: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistrationError::MalformedRule {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file format: {path} (expected {expected})")]
    UnsupportedFormat {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(format!("TOML error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(format!("YAML error: {}", err))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(format!("JSON error: {}", err))
    }
}

/// Errors raised while a rule executes
#[derive(Error, Debug)]
pub enum RuleError {
    /// No rule with this id is registered
    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    /// Rule params did not match the rule's schema
    #[error("Invalid rule params: {0}")]
    InvalidParams(String),

    /// A data source failed
    #[error("Source error: {0}")]
    Source(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
