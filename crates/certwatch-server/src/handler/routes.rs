//! Route manifest for the certwatch HTTP API
//!
//! - GET  /internal/certwatch/health
//! - GET  /internal/certwatch/certs
//! - POST /internal/certwatch/certs/_summarize
//! - GET  /internal/certwatch/rules
//! - POST /internal/certwatch/rules/{rule_id}/_execute

use axum::http::Method;
use certwatch_core::{
    get_cert_summary, Certificate, CertSummary, HealthState, Localizer, Thresholds, TlsSettings,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ApiError;
use crate::router::{BodyRule, RouteDefinition, RouteOptions, RouteRequest, RouteValidation};
use crate::rules::InMemoryRuleRegistry;
use crate::sources::CertSource;

pub const ROUTE_PREFIX: &str = "/internal/certwatch";

/// Source of the evaluation instant
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared state behind every route handler
#[derive(Clone)]
pub struct AppState {
    pub settings: TlsSettings,
    pub localizer: Arc<dyn Localizer>,
    pub certificates: Arc<dyn CertSource>,
    pub rules: Arc<InMemoryRuleRegistry>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        settings: TlsSettings,
        localizer: Arc<dyn Localizer>,
        certificates: Arc<dyn CertSource>,
        rules: Arc<InMemoryRuleRegistry>,
    ) -> Self {
        Self {
            settings,
            localizer,
            certificates,
            rules,
            clock: Arc::new(Utc::now),
        }
    }

    /// Pin the evaluation instant
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn summarize(
        &self,
        certs: &[Certificate],
        settings: &TlsSettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<CertSummary>, ApiError> {
        let thresholds = Thresholds::from_settings(now, settings)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(certs
            .iter()
            .map(|cert| get_cert_summary(cert, &thresholds, now, self.localizer.as_ref()))
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    rules: usize,
}

#[derive(Debug, Serialize)]
struct SummaryList {
    total: usize,
    alerting: usize,
    certificates: Vec<CertSummary>,
}

impl SummaryList {
    fn new(certificates: Vec<CertSummary>) -> Self {
        Self {
            total: certificates.len(),
            alerting: certificates.iter().filter(|s| s.is_alerting()).count(),
            certificates,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    certificates: Vec<Certificate>,
    #[serde(default)]
    settings: Option<TlsSettings>,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    params: Option<serde_json::Value>,
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::InternalError(e.to_string()))
}

fn parse_state(value: &str) -> Result<HealthState, ApiError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("Unknown certificate status '{}'", value)))
}

fn health(state: &AppState, _req: RouteRequest) -> Result<serde_json::Value, ApiError> {
    to_json(&HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rules: state.rules.len(),
    })
}

fn list_certs(state: &AppState, req: RouteRequest) -> Result<serde_json::Value, ApiError> {
    let filter = req.query_value("status").map(parse_state).transpose()?;
    let certs = state.certificates.certificates()?;

    let mut summaries = state.summarize(&certs, &state.settings, state.now())?;
    if let Some(wanted) = filter {
        summaries.retain(|s| s.state == wanted);
    }
    to_json(&SummaryList::new(summaries))
}

fn summarize_certs(state: &AppState, req: RouteRequest) -> Result<serde_json::Value, ApiError> {
    let body: SummarizeRequest = req.json()?;
    let settings = body.settings.unwrap_or(state.settings);
    let now = body.now.unwrap_or_else(|| state.now());
    let summaries = state.summarize(&body.certificates, &settings, now)?;
    to_json(&SummaryList::new(summaries))
}

fn list_rules(state: &AppState, _req: RouteRequest) -> Result<serde_json::Value, ApiError> {
    to_json(&state.rules.descriptors())
}

fn execute_rule(state: &AppState, req: RouteRequest) -> Result<serde_json::Value, ApiError> {
    let rule_id = req
        .param("rule_id")
        .ok_or_else(|| ApiError::BadRequest("missing rule id".to_string()))?
        .to_string();
    let body: ExecuteRequest = match req.body {
        Some(_) => req.json()?,
        None => ExecuteRequest::default(),
    };

    let alerts = state.rules.execute(&rule_id, state.now(), body.params)?;
    Ok(serde_json::json!({
        "ruleId": rule_id,
        "alerts": to_json(&alerts)?,
    }))
}

fn route(
    state: &Arc<AppState>,
    method: Method,
    path: &str,
    handler: fn(&AppState, RouteRequest) -> Result<serde_json::Value, ApiError>,
) -> RouteDefinition {
    let state = Arc::clone(state);
    RouteDefinition::new(method, format!("{}{}", ROUTE_PREFIX, path), move |req| {
        handler(&state, req)
    })
    .with_options(RouteOptions::default().with_tag("certwatch"))
}

/// The route manifest served by `certwatch serve`
pub fn certwatch_routes(state: Arc<AppState>) -> Vec<RouteDefinition> {
    vec![
        route(&state, Method::GET, "/health", health).with_options(RouteOptions::public()),
        route(&state, Method::GET, "/certs", list_certs),
        route(&state, Method::POST, "/certs/_summarize", summarize_certs)
            .with_validation(RouteValidation::none().with_body(BodyRule::Required)),
        route(&state, Method::GET, "/rules", list_rules),
        route(&state, Method::POST, "/rules/{rule_id}/_execute", execute_rule)
            .with_validation(RouteValidation::none().with_body(BodyRule::Optional)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::plan_routes;
    use crate::sources::StaticCertSource;
    use certwatch_core::{parse_timestamp, TemplateLocalizer};
    use std::collections::HashMap;

    fn state() -> Arc<AppState> {
        let certs = vec![
            Certificate::new(
                Some(parse_timestamp("2023-01-01").unwrap()),
                Some(parse_timestamp("2024-01-01").unwrap()),
            )
            .with_common_name("expired.example.com"),
            Certificate::new(
                Some(parse_timestamp("2023-06-01").unwrap()),
                Some(parse_timestamp("2025-06-01").unwrap()),
            )
            .with_common_name("healthy.example.com"),
        ];
        let now = parse_timestamp("2024-03-01").unwrap();
        Arc::new(
            AppState::new(
                TlsSettings::default(),
                Arc::new(TemplateLocalizer::english()),
                Arc::new(StaticCertSource::new(certs)),
                Arc::new(InMemoryRuleRegistry::new()),
            )
            .with_clock(Arc::new(move || now)),
        )
    }

    fn query(pairs: &[(&str, &str)]) -> RouteRequest {
        RouteRequest {
            query: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_manifest_is_valid() {
        let planned = plan_routes(certwatch_routes(state())).unwrap();
        assert_eq!(planned.len(), 5);
        assert!(planned
            .iter()
            .all(|(_, def)| def.path.starts_with(ROUTE_PREFIX)));
    }

    #[test]
    fn test_list_certs_with_filter() {
        let state = state();
        let all = list_certs(&state, RouteRequest::default()).unwrap();
        assert_eq!(all["total"], 2);
        assert_eq!(all["alerting"], 1);

        let expired = list_certs(&state, query(&[("status", "expired")])).unwrap();
        assert_eq!(expired["total"], 1);
        assert_eq!(expired["certificates"][0]["commonName"], "expired.example.com");

        let err = list_certs(&state, query(&[("status", "sideways")])).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_summarize_uses_supplied_instant() {
        let req = RouteRequest {
            body: Some(serde_json::json!({
                "certificates": [{"not_before": "2020-01-01", "not_after": "2024-01-01"}],
                "settings": {"expiration_threshold_days": 60},
                "now": "2023-12-01T00:00:00Z"
            })),
            ..Default::default()
        };
        let value = summarize_certs(&state(), req).unwrap();
        assert_eq!(
            value["certificates"][0]["summary"],
            "Expires on Jan 1, 2024 UTC in 31 days."
        );
    }

    #[test]
    fn test_summarize_rejects_zero_thresholds() {
        let req = RouteRequest {
            body: Some(serde_json::json!({
                "certificates": [],
                "settings": {"expiration_threshold_days": 0}
            })),
            ..Default::default()
        };
        assert!(matches!(
            summarize_certs(&state(), req),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_summarize_rejects_oversized_thresholds() {
        let req = RouteRequest {
            body: Some(serde_json::json!({
                "certificates": [],
                "settings": {"age_threshold_days": 4294967295u32}
            })),
            ..Default::default()
        };
        assert!(matches!(
            summarize_certs(&state(), req),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_execute_unknown_rule() {
        let req = RouteRequest {
            params: HashMap::from([("rule_id".to_string(), "missing".to_string())]),
            ..Default::default()
        };
        assert!(matches!(
            execute_rule(&state(), req),
            Err(ApiError::NotFound(_))
        ));
    }
}
