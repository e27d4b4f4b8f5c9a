//! Certificate metadata as supplied by the certificate-fetching side
//!
//! The core never parses X.509 material. It receives already-extracted
//! validity dates and identity strings, plus the monitor context the
//! certificate was observed from.

use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A TLS certificate observed by a monitor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Start of the validity window
    #[serde(default, with = "optional_timestamp")]
    pub not_before: Option<DateTime<Utc>>,
    /// End of the validity window
    #[serde(default, with = "optional_timestamp")]
    pub not_after: Option<DateTime<Utc>>,
    /// Subject common name
    #[serde(default)]
    pub common_name: Option<String>,
    /// Issuer common name
    #[serde(default)]
    pub issuer: Option<String>,
    /// SHA-256 fingerprint
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default, alias = "monitorName")]
    pub monitor_name: Option<String>,
    #[serde(default, alias = "monitorType")]
    pub monitor_type: Option<String>,
    #[serde(default, alias = "monitorUrl")]
    pub monitor_url: Option<String>,
    #[serde(default, alias = "locationName")]
    pub location_name: Option<String>,
}

impl Certificate {
    /// Create a certificate with the given validity window
    pub fn new(not_before: Option<DateTime<Utc>>, not_after: Option<DateTime<Utc>>) -> Self {
        Self {
            not_before,
            not_after,
            ..Default::default()
        }
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Attach the monitor context the certificate was observed from
    pub fn with_monitor(
        mut self,
        name: impl Into<String>,
        monitor_type: impl Into<String>,
        url: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.monitor_name = Some(name.into());
        self.monitor_type = Some(monitor_type.into());
        self.monitor_url = Some(url.into());
        self.location_name = Some(location.into());
        self
    }

    /// Decode a list of certificates from a JSON array
    pub fn list_from_json(content: &str) -> Result<Vec<Certificate>> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Parse a timestamp written either as RFC 3339 or as a bare date
///
/// Bare dates are taken as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CoreError::invalid_timestamp(value))
}

/// Serde adapter for optional timestamps
///
/// An absent field, `null` and the empty string all decode to `None`.
mod optional_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_timestamp(value).map(Some).map_err(de::Error::custom),
        }
    }
}
