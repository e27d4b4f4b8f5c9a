//! TLS certificate rule

use certwatch_core::{get_cert_summary, Certificate, Localizer, Thresholds, TlsSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    ActionGroup, Alert, RuleExecutionContext, RuleExecutor, RuleType, MINIMUM_LICENSE, PRODUCER,
};
use crate::error::RuleError;
use crate::sources::CertSource;

pub const TLS_RULE_ID: &str = "certwatch.alerts.tls";
pub const TLS_ACTION_GROUP: &str = "certwatch.tls";

/// Per-rule threshold overrides, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsRuleParams {
    pub cert_expiration_threshold: u32,
    pub cert_age_threshold: u32,
}

impl From<TlsSettings> for TlsRuleParams {
    fn from(settings: TlsSettings) -> Self {
        Self {
            cert_expiration_threshold: settings.expiration_threshold_days,
            cert_age_threshold: settings.age_threshold_days,
        }
    }
}

impl From<TlsRuleParams> for TlsSettings {
    fn from(params: TlsRuleParams) -> Self {
        Self {
            expiration_threshold_days: params.cert_expiration_threshold,
            age_threshold_days: params.cert_age_threshold,
        }
    }
}

struct TlsExecutor {
    localizer: Arc<dyn Localizer>,
    source: Arc<dyn CertSource>,
}

impl RuleExecutor for TlsExecutor {
    fn execute(&self, context: &RuleExecutionContext) -> Result<Vec<Alert>, RuleError> {
        let params: TlsRuleParams = serde_json::from_value(context.params.clone())
            .map_err(|e| RuleError::InvalidParams(e.to_string()))?;
        let thresholds = Thresholds::from_settings(context.now, &params.into())
            .map_err(|e| RuleError::InvalidParams(e.to_string()))?;
        let certificates = self.source.certificates()?;
        let total = certificates.len();

        let mut alerts = Vec::new();
        for cert in &certificates {
            let summary = get_cert_summary(cert, &thresholds, context.now, self.localizer.as_ref());
            if !summary.is_alerting() {
                continue;
            }
            alerts.push(Alert {
                instance_id: instance_id(cert),
                action_group: TLS_ACTION_GROUP.to_string(),
                reason: summary.summary.clone(),
                context: serde_json::to_value(&summary)?,
            });
        }

        tracing::info!(
            rule.id = TLS_RULE_ID,
            certificates = total,
            alerts = alerts.len(),
            "tls rule evaluated"
        );
        Ok(alerts)
    }
}

/// Alert instance id for a certificate
///
/// Fingerprint first, then common name, then the observing monitor.
pub fn instance_id(cert: &Certificate) -> String {
    [&cert.sha256, &cert.common_name, &cert.monitor_name]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn tls_rule(
    settings: TlsSettings,
    localizer: Arc<dyn Localizer>,
    source: Arc<dyn CertSource>,
) -> RuleType {
    let default_params = serde_json::json!({
        "certExpirationThreshold": settings.expiration_threshold_days,
        "certAgeThreshold": settings.age_threshold_days,
    });

    RuleType {
        id: TLS_RULE_ID.to_string(),
        name: "TLS certificate".to_string(),
        action_groups: vec![ActionGroup::new(TLS_ACTION_GROUP, "TLS Certificate")],
        default_action_group_id: TLS_ACTION_GROUP.to_string(),
        producer: PRODUCER.to_string(),
        minimum_license: MINIMUM_LICENSE.to_string(),
        default_params,
        executor: Arc::new(TlsExecutor { localizer, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockCertSource, StaticCertSource};
    use certwatch_core::{parse_timestamp, HealthState, TemplateLocalizer, MISSING_NOT_AFTER_SUMMARY};
    use chrono::{DateTime, Utc};

    fn ts(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    fn certs() -> Vec<Certificate> {
        vec![
            Certificate::new(Some(ts("2023-06-01")), Some(ts("2024-01-01")))
                .with_sha256("aa11")
                .with_common_name("expired.example.com"),
            Certificate::new(Some(ts("2023-06-01")), Some(ts("2024-03-20")))
                .with_common_name("expiring.example.com"),
            Certificate::new(Some(ts("2023-06-01")), Some(ts("2025-06-01")))
                .with_common_name("healthy.example.com"),
            Certificate::new(Some(ts("2021-01-01")), Some(ts("2026-01-01")))
                .with_monitor("legacy", "http", "https://legacy.example.com", "eu-west"),
            Certificate::new(Some(ts("2023-06-01")), None).with_common_name("broken.example.com"),
        ]
    }

    fn rule_with(certs: Vec<Certificate>) -> RuleType {
        tls_rule(
            TlsSettings::default(),
            Arc::new(TemplateLocalizer::english()),
            Arc::new(StaticCertSource::new(certs)),
        )
    }

    #[test]
    fn test_alerts_for_each_unhealthy_certificate() {
        let alerts = rule_with(certs()).execute(ts("2024-03-01"), None).unwrap();
        let ids: Vec<&str> = alerts.iter().map(|a| a.instance_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["aa11", "expiring.example.com", "legacy", "broken.example.com"]
        );
        assert!(alerts.iter().all(|a| a.action_group == TLS_ACTION_GROUP));

        assert_eq!(alerts[0].reason, "Expired on Jan 1, 2024 UTC, 60 days ago.");
        assert_eq!(alerts[0].context["status"], "expired");
        assert_eq!(alerts[1].context["state"], "expiring");
        assert_eq!(alerts[2].context["status"], "becoming too old");
        assert_eq!(alerts[2].context["monitorName"], "legacy");
        assert_eq!(alerts[3].reason, MISSING_NOT_AFTER_SUMMARY);
        assert_eq!(alerts[3].context["state"], "unknown");
    }

    #[test]
    fn test_params_override_settings() {
        let rule = rule_with(certs());
        let params = serde_json::json!({"certExpirationThreshold": 500, "certAgeThreshold": 5000});
        let alerts = rule.execute(ts("2024-03-01"), Some(params)).unwrap();

        // wider expiration window catches healthy.example.com; legacy is no longer aging
        let ids: Vec<&str> = alerts.iter().map(|a| a.instance_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["aa11", "expiring.example.com", "healthy.example.com", "broken.example.com"]
        );
        assert_eq!(alerts[2].context["state"], HealthState::Expiring.to_string());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let rule = rule_with(certs());
        let err = rule
            .execute(ts("2024-03-01"), Some(serde_json::json!({"certAgeThreshold": "soon"})))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidParams(_)));

        let err = rule
            .execute(ts("2024-03-01"), Some(serde_json::json!({"certAgeThreshold": 0})))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidParams(_)));
    }

    #[test]
    fn test_out_of_range_thresholds_rejected() {
        let rule = rule_with(certs());
        for params in [
            serde_json::json!({"certExpirationThreshold": 4294967295u32}),
            serde_json::json!({"certAgeThreshold": 4294967295u32}),
            serde_json::json!({"certAgeThreshold": certwatch_core::MAX_THRESHOLD_DAYS + 1}),
        ] {
            let err = rule.execute(ts("2024-03-01"), Some(params)).unwrap_err();
            assert!(matches!(err, RuleError::InvalidParams(_)));
        }
    }

    #[test]
    fn test_default_params_parse_back() {
        let settings = TlsSettings {
            expiration_threshold_days: 21,
            age_threshold_days: 400,
        };
        let rule = tls_rule(
            settings,
            Arc::new(TemplateLocalizer::english()),
            Arc::new(StaticCertSource::default()),
        );
        let params: TlsRuleParams = serde_json::from_value(rule.default_params).unwrap();
        assert_eq!(TlsSettings::from(params), settings);
    }

    #[test]
    fn test_source_failure_propagates() {
        let mut source = MockCertSource::new();
        source
            .expect_certificates()
            .returning(|| Err(RuleError::Source("index unavailable".to_string())));
        let rule = tls_rule(
            TlsSettings::default(),
            Arc::new(TemplateLocalizer::english()),
            Arc::new(source),
        );

        let err = rule.execute(ts("2024-03-01"), None).unwrap_err();
        assert!(matches!(err, RuleError::Source(_)));
    }

    #[test]
    fn test_default_params_follow_settings() {
        let rule = tls_rule(
            TlsSettings {
                expiration_threshold_days: 14,
                age_threshold_days: 365,
            },
            Arc::new(TemplateLocalizer::english()),
            Arc::new(StaticCertSource::default()),
        );
        assert_eq!(
            rule.default_params,
            serde_json::json!({"certExpirationThreshold": 14, "certAgeThreshold": 365})
        );
    }

    #[test]
    fn test_instance_id_fallbacks() {
        let cert = Certificate::default().with_common_name("cn").with_sha256("");
        assert_eq!(instance_id(&cert), "cn");
        assert_eq!(instance_id(&Certificate::default()), "unknown");
    }
}
