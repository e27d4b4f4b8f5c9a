//! Data sources consumed by the alert rules
//!
//! Certificates and monitor statuses arrive already parsed. The static
//! sources here load them once from JSON or YAML files.

use certwatch_core::Certificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{ConfigError, RuleError};

/// Supplies the certificates the TLS rule evaluates
#[cfg_attr(test, mockall::automock)]
pub trait CertSource: Send + Sync {
    fn certificates(&self) -> Result<Vec<Certificate>, RuleError>;
}

/// Supplies the latest status of each monitor
#[cfg_attr(test, mockall::automock)]
pub trait MonitorStatusSource: Send + Sync {
    fn statuses(&self) -> Result<Vec<MonitorStatus>, RuleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Up,
    Down,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Up => write!(f, "up"),
            MonitorState::Down => write!(f, "down"),
        }
    }
}

/// Latest check result for one monitor at one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub monitor_id: String,
    #[serde(default)]
    pub monitor_name: Option<String>,
    #[serde(default)]
    pub monitor_type: Option<String>,
    #[serde(default)]
    pub monitor_url: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    pub status: MonitorState,
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl MonitorStatus {
    pub fn is_down(&self) -> bool {
        self.status == MonitorState::Down
    }

    /// Display name, falling back to the monitor id
    pub fn display_name(&self) -> &str {
        self.monitor_name.as_deref().unwrap_or(&self.monitor_id)
    }
}

/// Fixed set of certificates
#[derive(Debug, Clone, Default)]
pub struct StaticCertSource {
    certificates: Vec<Certificate>,
}

impl StaticCertSource {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_list(path.as_ref()).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl CertSource for StaticCertSource {
    fn certificates(&self) -> Result<Vec<Certificate>, RuleError> {
        Ok(self.certificates.clone())
    }
}

/// Fixed set of monitor statuses
#[derive(Debug, Clone, Default)]
pub struct StaticMonitorSource {
    statuses: Vec<MonitorStatus>,
}

impl StaticMonitorSource {
    pub fn new(statuses: Vec<MonitorStatus>) -> Self {
        Self { statuses }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_list(path.as_ref()).map(Self::new)
    }
}

impl MonitorStatusSource for StaticMonitorSource {
    fn statuses(&self) -> Result<Vec<MonitorStatus>, RuleError> {
        Ok(self.statuses.clone())
    }
}

fn load_list<T>(path: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let items: Vec<T> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                expected: ".json, .yaml or .yml",
            })
        }
    };

    tracing::debug!(path = %path.display(), count = items.len(), "loaded source file");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cert_source_from_json() {
        let file = write_temp(
            ".json",
            r#"[{"not_before": "2023-01-01", "not_after": "2024-01-01", "common_name": "a.example.com"}]"#,
        );
        let source = StaticCertSource::from_file(file.path()).unwrap();
        assert_eq!(source.len(), 1);

        let certs = source.certificates().unwrap();
        assert_eq!(certs[0].common_name.as_deref(), Some("a.example.com"));
        assert!(certs[0].not_after.is_some());
    }

    #[test]
    fn test_monitor_source_from_yaml() {
        let file = write_temp(
            ".yaml",
            "- monitor_id: m1\n  monitor_name: Homepage\n  location_name: us-east\n  status: down\n  checked_at: 2024-03-01T12:00:00Z\n  error_message: connection refused\n- monitor_id: m2\n  status: up\n  checked_at: 2024-03-01T12:00:00Z\n",
        );
        let statuses = StaticMonitorSource::from_file(file.path())
            .unwrap()
            .statuses()
            .unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].is_down());
        assert_eq!(statuses[0].display_name(), "Homepage");
        assert_eq!(statuses[1].display_name(), "m2");
        assert_eq!(statuses[1].status, MonitorState::Up);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".txt", "[]");
        let err = StaticCertSource::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { expected: ".json, .yaml or .yml", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = StaticMonitorSource::from_file("/nonexistent/statuses.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
