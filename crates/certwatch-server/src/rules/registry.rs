//! In-memory rule type registry

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::{Alert, RuleDescriptor, RuleType, RuleTypeRegistry};
use crate::error::{HostError, RuleError};

/// Holds registered rule types and runs them on demand
#[derive(Debug, Default)]
pub struct InMemoryRuleRegistry {
    rules: BTreeMap<String, RuleType>,
}

impl InMemoryRuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RuleType> {
        self.rules.get(id)
    }

    /// Descriptors of every registered rule, ordered by id
    pub fn descriptors(&self) -> Vec<RuleDescriptor> {
        self.rules.values().map(RuleType::descriptor).collect()
    }

    /// Execute the rule registered under `id`
    pub fn execute(
        &self,
        id: &str,
        now: DateTime<Utc>,
        params: Option<serde_json::Value>,
    ) -> Result<Vec<Alert>, RuleError> {
        let rule = self
            .rules
            .get(id)
            .ok_or_else(|| RuleError::UnknownRule(id.to_string()))?;
        rule.execute(now, params)
    }
}

impl RuleTypeRegistry for InMemoryRuleRegistry {
    fn register_type(&mut self, rule: RuleType) -> Result<(), HostError> {
        if self.rules.contains_key(&rule.id) {
            return Err(HostError::Conflict(format!(
                "rule type '{}' is already registered",
                rule.id
            )));
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }
}
