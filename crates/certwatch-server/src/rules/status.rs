//! Monitor status rule

use certwatch_core::{Localizer, MessageKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    ActionGroup, Alert, RuleExecutionContext, RuleExecutor, RuleType, MINIMUM_LICENSE, PRODUCER,
};
use crate::error::RuleError;
use crate::sources::{MonitorStatus, MonitorStatusSource};

pub const STATUS_RULE_ID: &str = "certwatch.alerts.monitorStatus";
pub const STATUS_ACTION_GROUP: &str = "certwatch.monitorStatus";

const UNNAMED_LOCATION: &str = "Unnamed-location";

/// Restricts the rule to the listed monitors; empty means all
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRuleParams {
    #[serde(default)]
    pub monitor_ids: Vec<String>,
}

struct StatusExecutor {
    localizer: Arc<dyn Localizer>,
    source: Arc<dyn MonitorStatusSource>,
}

impl StatusExecutor {
    fn reason(&self, status: &MonitorStatus) -> String {
        let mut reason = self.localizer.translate(
            MessageKey::MonitorDown,
            &[
                ("name", status.display_name().to_string()),
                (
                    "location",
                    status
                        .location_name
                        .as_deref()
                        .unwrap_or(UNNAMED_LOCATION)
                        .to_string(),
                ),
                ("date", self.localizer.format_date(status.checked_at)),
            ],
        );
        if let Some(message) = status.error_message.as_deref().filter(|m| !m.is_empty()) {
            reason.push(' ');
            reason.push_str(message);
        }
        reason
    }
}

impl RuleExecutor for StatusExecutor {
    fn execute(&self, context: &RuleExecutionContext) -> Result<Vec<Alert>, RuleError> {
        let params: StatusRuleParams = serde_json::from_value(context.params.clone())
            .map_err(|e| RuleError::InvalidParams(e.to_string()))?;

        let alerts = self
            .source
            .statuses()?
            .into_iter()
            .filter(MonitorStatus::is_down)
            .filter(|s| params.monitor_ids.is_empty() || params.monitor_ids.contains(&s.monitor_id))
            .map(|status| -> Result<Alert, RuleError> {
                let location = status.location_name.as_deref().unwrap_or(UNNAMED_LOCATION);
                Ok(Alert {
                    instance_id: format!("{}-{}", status.monitor_id, location),
                    action_group: STATUS_ACTION_GROUP.to_string(),
                    reason: self.reason(&status),
                    context: serde_json::to_value(&status)?,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        tracing::info!(rule.id = STATUS_RULE_ID, alerts = alerts.len(), "status rule evaluated");
        Ok(alerts)
    }
}

pub fn status_rule(
    localizer: Arc<dyn Localizer>,
    source: Arc<dyn MonitorStatusSource>,
) -> RuleType {
    RuleType {
        id: STATUS_RULE_ID.to_string(),
        name: "Monitor status".to_string(),
        action_groups: vec![ActionGroup::new(STATUS_ACTION_GROUP, "Monitor Down")],
        default_action_group_id: STATUS_ACTION_GROUP.to_string(),
        producer: PRODUCER.to_string(),
        minimum_license: MINIMUM_LICENSE.to_string(),
        default_params: serde_json::json!({ "monitorIds": [] }),
        executor: Arc::new(StatusExecutor { localizer, source }),
    }
}
