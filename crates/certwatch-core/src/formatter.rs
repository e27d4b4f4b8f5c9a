//! Alert summary formatting
//!
//! Turns a classified certificate into the `{summary, status}` pair and the
//! identity payload handed to alert notifications.

use crate::certificate::Certificate;
use crate::classifier::{breached_threshold, relative_days, CertStatus, HealthState};
use crate::localizer::{Localizer, MessageKey};
use crate::thresholds::{Threshold, Thresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary used when the expiring branch applies but `not_after` is absent
pub const MISSING_NOT_AFTER_SUMMARY: &str = "Error, missing `certificate_not_valid_after` date.";

/// Summary used when the aging branch applies but `not_before` is absent
pub const MISSING_NOT_BEFORE_SUMMARY: &str = "Error, missing `certificate_not_valid_before` date.";

/// Summary text and optional status for one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsContent {
    pub summary: String,
    pub status: Option<CertStatus>,
}

impl TlsContent {
    fn diagnostic(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            status: None,
        }
    }
}

/// Alert payload for one certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertSummary {
    /// Human-readable summary; empty when healthy
    pub summary: String,
    /// Localized status label; empty when there is no alert condition
    pub status: String,
    pub common_name: String,
    pub issuer: String,
    pub monitor_name: Option<String>,
    pub monitor_type: Option<String>,
    pub location_name: Option<String>,
    pub monitor_url: Option<String>,
    /// Derived health state
    pub state: HealthState,
}

impl CertSummary {
    /// Whether this summary describes an alert condition
    pub fn is_alerting(&self) -> bool {
        self.state.is_alerting()
    }
}

/// Localized label for a status
pub fn status_label(status: CertStatus, localizer: &dyn Localizer) -> String {
    let key = match status {
        CertStatus::Expired => MessageKey::ExpiredLabel,
        CertStatus::Expiring => MessageKey::ExpiringLabel,
        CertStatus::Aging => MessageKey::AgingLabel,
        CertStatus::Invalid => MessageKey::InvalidLabel,
    };
    localizer.translate(key, &[])
}

/// Format the expiring branch from `not_after`
pub fn format_valid_after(
    cert: &Certificate,
    now: DateTime<Utc>,
    localizer: &dyn Localizer,
) -> TlsContent {
    let Some(date) = cert.not_after else {
        tracing::debug!(
            common_name = cert.common_name.as_deref().unwrap_or_default(),
            "certificate has no not_after date"
        );
        return TlsContent::diagnostic(MISSING_NOT_AFTER_SUMMARY);
    };

    let days = relative_days(now, date);
    let params = date_params(localizer, date, days);

    if days >= 0 {
        TlsContent {
            summary: localizer.translate(MessageKey::ValidAfterExpired, &params),
            status: Some(CertStatus::Expired),
        }
    } else {
        TlsContent {
            summary: localizer.translate(MessageKey::ValidAfterExpiring, &params),
            status: Some(CertStatus::Expiring),
        }
    }
}

/// Format the aging branch from `not_before`
pub fn format_valid_before(
    cert: &Certificate,
    now: DateTime<Utc>,
    localizer: &dyn Localizer,
) -> TlsContent {
    let Some(date) = cert.not_before else {
        tracing::debug!(
            common_name = cert.common_name.as_deref().unwrap_or_default(),
            "certificate has no not_before date"
        );
        return TlsContent::diagnostic(MISSING_NOT_BEFORE_SUMMARY);
    };

    let days = relative_days(now, date);
    let params = date_params(localizer, date, days);

    if days >= 0 {
        TlsContent {
            summary: localizer.translate(MessageKey::ValidBeforeExpired, &params),
            status: Some(CertStatus::Aging),
        }
    } else {
        TlsContent {
            summary: localizer.translate(MessageKey::ValidBeforeExpiring, &params),
            status: Some(CertStatus::Invalid),
        }
    }
}

fn date_params(
    localizer: &dyn Localizer,
    date: DateTime<Utc>,
    days: i64,
) -> [(&'static str, String); 2] {
    [
        ("date", localizer.format_date(date)),
        ("days", days.unsigned_abs().to_string()),
    ]
}

/// Build the alert payload for a certificate
///
/// The expiring branch wins when both thresholds are crossed. A healthy
/// certificate yields empty `summary` and `status` while still carrying
/// its identity fields.
pub fn get_cert_summary(
    cert: &Certificate,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
    localizer: &dyn Localizer,
) -> CertSummary {
    let content = match breached_threshold(cert, thresholds) {
        Some(Threshold::Expiration) => Some(format_valid_after(cert, now, localizer)),
        Some(Threshold::Age) => Some(format_valid_before(cert, now, localizer)),
        None => None,
    };

    let (summary, status, state) = match content {
        Some(TlsContent {
            summary,
            status: Some(status),
        }) => (
            summary,
            status_label(status, localizer),
            HealthState::from(status),
        ),
        Some(TlsContent {
            summary,
            status: None,
        }) => (summary, String::new(), HealthState::Unknown),
        None => (String::new(), String::new(), HealthState::Healthy),
    };

    CertSummary {
        summary,
        status,
        common_name: cert.common_name.clone().unwrap_or_default(),
        issuer: cert.issuer.clone().unwrap_or_default(),
        monitor_name: cert.monitor_name.clone(),
        monitor_type: cert.monitor_type.clone(),
        location_name: cert.location_name.clone(),
        monitor_url: cert.monitor_url.clone(),
        state,
    }
}
