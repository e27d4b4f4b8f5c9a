//! Alert rule types and their registration
//!
//! Two rule types are registered with the host alerting registry at startup:
//!
//! - `certwatch.alerts.monitorStatus`: one alert per monitor that is down
//! - `certwatch.alerts.tls`: one alert per certificate that is expired,
//!   expiring, aging, not yet valid or missing a validity date
//!
//! Everything the rules need comes in through an explicit [`PluginSetup`].

pub mod registry;
pub mod status;
pub mod tls;

pub use registry::InMemoryRuleRegistry;
pub use status::{status_rule, STATUS_ACTION_GROUP, STATUS_RULE_ID};
pub use tls::{tls_rule, TlsRuleParams, TLS_ACTION_GROUP, TLS_RULE_ID};

use certwatch_core::{Localizer, TlsSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HostError, RegistrationError, RuleError};
use crate::sources::{CertSource, MonitorStatusSource};

/// Producer reported for every rule type
pub const PRODUCER: &str = "certwatch";

/// Minimum license level reported for every rule type
pub const MINIMUM_LICENSE: &str = "basic";

/// A named group of actions an alert can be scheduled into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub id: String,
    pub name: String,
}

impl ActionGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An alert instance raised by one rule execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Stable id of the alerting subject
    pub instance_id: String,
    pub action_group: String,
    /// Human-readable reason
    pub reason: String,
    /// Payload handed to notification templates
    pub context: serde_json::Value,
}

/// Inputs to one rule execution
#[derive(Debug, Clone)]
pub struct RuleExecutionContext {
    pub now: DateTime<Utc>,
    /// Rule params merged over the rule type's defaults
    pub params: serde_json::Value,
}

/// The evaluation callable of a rule type
pub trait RuleExecutor: Send + Sync {
    fn execute(&self, context: &RuleExecutionContext) -> Result<Vec<Alert>, RuleError>;
}

/// A rule type definition as handed to the host registry
#[derive(Clone)]
pub struct RuleType {
    pub id: String,
    pub name: String,
    pub action_groups: Vec<ActionGroup>,
    pub default_action_group_id: String,
    pub producer: String,
    pub minimum_license: String,
    pub default_params: serde_json::Value,
    pub executor: Arc<dyn RuleExecutor>,
}

impl RuleType {
    /// Check the definition before it reaches a host
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.id.trim().is_empty() {
            return Err(RegistrationError::malformed_rule(&self.id, "id is empty"));
        }
        if self.name.trim().is_empty() {
            return Err(RegistrationError::malformed_rule(&self.id, "name is empty"));
        }
        if self.action_groups.is_empty() {
            return Err(RegistrationError::malformed_rule(
                &self.id,
                "no action groups defined",
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.action_groups.iter().find(|g| !seen.insert(g.id.as_str())) {
            return Err(RegistrationError::malformed_rule(
                &self.id,
                format!("duplicate action group '{}'", dup.id),
            ));
        }

        if !seen.contains(self.default_action_group_id.as_str()) {
            return Err(RegistrationError::malformed_rule(
                &self.id,
                format!(
                    "default action group '{}' is not among its action groups",
                    self.default_action_group_id
                ),
            ));
        }

        if !self.default_params.is_object() {
            return Err(RegistrationError::malformed_rule(
                &self.id,
                "default params must be an object",
            ));
        }

        Ok(())
    }

    pub fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            action_groups: self.action_groups.clone(),
            default_action_group_id: self.default_action_group_id.clone(),
            producer: self.producer.clone(),
            minimum_license: self.minimum_license.clone(),
            default_params: self.default_params.clone(),
        }
    }

    /// Merge `params` over the defaults
    ///
    /// `None` and JSON `null` mean "use the defaults"; anything other than an
    /// object is rejected.
    pub fn resolve_params(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, RuleError> {
        let mut merged = self.default_params.clone();
        match params {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::Object(overrides)) => {
                if let Some(base) = merged.as_object_mut() {
                    base.extend(overrides);
                }
            }
            Some(other) => {
                return Err(RuleError::InvalidParams(format!(
                    "params must be an object, got {}",
                    other
                )))
            }
        }
        Ok(merged)
    }

    pub fn execute(
        &self,
        now: DateTime<Utc>,
        params: Option<serde_json::Value>,
    ) -> Result<Vec<Alert>, RuleError> {
        let context = RuleExecutionContext {
            now,
            params: self.resolve_params(params)?,
        };
        let alerts = self.executor.execute(&context)?;
        debug!(rule.id = %self.id, alerts = alerts.len(), "rule executed");
        Ok(alerts)
    }
}

impl fmt::Debug for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("action_groups", &self.action_groups)
            .field("default_action_group_id", &self.default_action_group_id)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a registered rule type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub id: String,
    pub name: String,
    pub action_groups: Vec<ActionGroup>,
    pub default_action_group_id: String,
    pub producer: String,
    pub minimum_license: String,
    pub default_params: serde_json::Value,
}

/// Host alerting registry
#[cfg_attr(test, mockall::automock)]
pub trait RuleTypeRegistry {
    fn register_type(&mut self, rule: RuleType) -> Result<(), HostError>;
}

/// Collaborators handed to the rules at startup
#[derive(Clone)]
pub struct PluginSetup {
    pub settings: TlsSettings,
    pub localizer: Arc<dyn Localizer>,
    pub certificates: Arc<dyn CertSource>,
    pub monitors: Arc<dyn MonitorStatusSource>,
}

/// Build the rule types for `setup`, status rule first
pub fn rule_types(setup: &PluginSetup) -> Vec<RuleType> {
    vec![
        status_rule(setup.localizer.clone(), setup.monitors.clone()),
        tls_rule(
            setup.settings,
            setup.localizer.clone(),
            setup.certificates.clone(),
        ),
    ]
}

/// Register both rule types with `registry`
///
/// Every definition is validated before the first registration call.
pub fn register_rules<R>(
    setup: &PluginSetup,
    registry: &mut R,
) -> Result<Vec<RuleDescriptor>, RegistrationError>
where
    R: RuleTypeRegistry + ?Sized,
{
    let rules = rule_types(setup);
    for rule in &rules {
        rule.validate()?;
    }

    let mut descriptors = Vec::with_capacity(rules.len());
    for rule in rules {
        let descriptor = rule.descriptor();
        debug!(rule.id = %descriptor.id, "registering rule type");
        registry.register_type(rule)?;
        descriptors.push(descriptor);
    }

    info!(rules = descriptors.len(), "rule types registered");
    Ok(descriptors)
}
