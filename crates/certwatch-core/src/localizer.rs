//! Localized rendering of dates and alert messages
//!
//! The host owns translations. The core only needs two capabilities: turning
//! a timestamp into display text and rendering a keyed message template with
//! named parameters. [`TemplateLocalizer`] ships the English catalog and
//! accepts per-key overrides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// `Jan 1, 2024 UTC`
pub const DEFAULT_DATE_FORMAT: &str = "%b %-d, %Y %Z";

/// Keys of the messages the formatter and alert rules render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    /// `not_after` in the past; params `date`, `days`
    ValidAfterExpired,
    /// `not_after` in the future; params `date`, `days`
    ValidAfterExpiring,
    /// `not_before` in the past; params `date`, `days`
    ValidBeforeExpired,
    /// `not_before` in the future; params `date`, `days`
    ValidBeforeExpiring,
    ExpiredLabel,
    ExpiringLabel,
    AgingLabel,
    InvalidLabel,
    /// Monitor status alert reason; params `name`, `location`, `date`
    MonitorDown,
}

impl MessageKey {
    pub const ALL: [MessageKey; 9] = [
        MessageKey::ValidAfterExpired,
        MessageKey::ValidAfterExpiring,
        MessageKey::ValidBeforeExpired,
        MessageKey::ValidBeforeExpiring,
        MessageKey::ExpiredLabel,
        MessageKey::ExpiringLabel,
        MessageKey::AgingLabel,
        MessageKey::InvalidLabel,
        MessageKey::MonitorDown,
    ];

    /// English template for this key
    pub fn default_template(&self) -> &'static str {
        match self {
            MessageKey::ValidAfterExpired => "Expired on {date}, {days} days ago.",
            MessageKey::ValidAfterExpiring => "Expires on {date} in {days} days.",
            MessageKey::ValidBeforeExpired => {
                "Valid since {date}, {days} days ago, nearing rotation age."
            }
            MessageKey::ValidBeforeExpiring => "Becomes valid on {date} in {days} days.",
            MessageKey::ExpiredLabel => "expired",
            MessageKey::ExpiringLabel => "expiring",
            MessageKey::AgingLabel => "becoming too old",
            MessageKey::InvalidLabel => "invalid",
            MessageKey::MonitorDown => "Monitor {name} from {location} is down. Checked at {date}.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::ValidAfterExpired => "valid_after_expired",
            MessageKey::ValidAfterExpiring => "valid_after_expiring",
            MessageKey::ValidBeforeExpired => "valid_before_expired",
            MessageKey::ValidBeforeExpiring => "valid_before_expiring",
            MessageKey::ExpiredLabel => "expired_label",
            MessageKey::ExpiringLabel => "expiring_label",
            MessageKey::AgingLabel => "aging_label",
            MessageKey::InvalidLabel => "invalid_label",
            MessageKey::MonitorDown => "monitor_down",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date and message rendering supplied by the host
pub trait Localizer: Send + Sync {
    /// Render a timestamp for display in a summary
    fn format_date(&self, timestamp: DateTime<Utc>) -> String;

    /// Render the message for `key`, substituting `{name}` placeholders
    fn translate(&self, key: MessageKey, params: &[(&str, String)]) -> String;
}

/// Template-based localizer
#[derive(Debug, Clone)]
pub struct TemplateLocalizer {
    templates: HashMap<MessageKey, String>,
    date_format: String,
}

impl Default for TemplateLocalizer {
    fn default() -> Self {
        Self::english()
    }
}

impl TemplateLocalizer {
    /// The built-in English catalog
    pub fn english() -> Self {
        Self {
            templates: MessageKey::ALL
                .iter()
                .map(|key| (*key, key.default_template().to_string()))
                .collect(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Replace the template for one key
    pub fn with_template(mut self, key: MessageKey, template: impl Into<String>) -> Self {
        self.templates.insert(key, template.into());
        self
    }

    /// Replace templates for every key present in `overrides`
    pub fn with_overrides<I, S>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (MessageKey, S)>,
        S: Into<String>,
    {
        for (key, template) in overrides {
            self.templates.insert(key, template.into());
        }
        self
    }

    /// Use a different `chrono` strftime pattern for dates
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.templates
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }
}

impl Localizer for TemplateLocalizer {
    fn format_date(&self, timestamp: DateTime<Utc>) -> String {
        timestamp.format(&self.date_format).to_string()
    }

    fn translate(&self, key: MessageKey, params: &[(&str, String)]) -> String {
        render_template(self.template(key), params)
    }
}

/// Substitute `{name}` placeholders; unknown placeholders are left in place
pub fn render_template(template: &str, params: &[(&str, String)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_english_date_format() {
        let localizer = TemplateLocalizer::english();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(localizer.format_date(ts), "Jan 1, 2024 UTC");

        let ts = Utc.with_ymd_and_hms(2023, 12, 25, 13, 30, 0).unwrap();
        assert_eq!(localizer.format_date(ts), "Dec 25, 2023 UTC");
    }

    #[test]
    fn test_translate_substitutes_params() {
        let localizer = TemplateLocalizer::english();
        let text = localizer.translate(
            MessageKey::ValidAfterExpired,
            &[("date", "Jan 1, 2024 UTC".to_string()), ("days", "60".to_string())],
        );
        assert_eq!(text, "Expired on Jan 1, 2024 UTC, 60 days ago.");
    }

    #[test]
    fn test_labels() {
        let localizer = TemplateLocalizer::english();
        assert_eq!(localizer.translate(MessageKey::AgingLabel, &[]), "becoming too old");
        assert_eq!(localizer.translate(MessageKey::ExpiredLabel, &[]), "expired");
    }

    #[test]
    fn test_monitor_down_template() {
        let text = TemplateLocalizer::english().translate(
            MessageKey::MonitorDown,
            &[
                ("name", "API".to_string()),
                ("location", "eu-west".to_string()),
                ("date", "Mar 1, 2024 UTC".to_string()),
            ],
        );
        assert_eq!(text, "Monitor API from eu-west is down. Checked at Mar 1, 2024 UTC.");
    }

    #[test]
    fn test_overrides() {
        let localizer = TemplateLocalizer::english()
            .with_template(MessageKey::ExpiredLabel, "abgelaufen")
            .with_overrides([(MessageKey::ExpiringLabel, "läuft ab")]);
        assert_eq!(localizer.translate(MessageKey::ExpiredLabel, &[]), "abgelaufen");
        assert_eq!(localizer.translate(MessageKey::ExpiringLabel, &[]), "läuft ab");
        assert_eq!(localizer.translate(MessageKey::InvalidLabel, &[]), "invalid");
    }

    #[test]
    fn test_custom_date_format() {
        let localizer = TemplateLocalizer::english().with_date_format("%Y-%m-%d");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(localizer.format_date(ts), "2024-01-01");
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(
            render_template("{date} / {other}", &[("date", "today".to_string())]),
            "today / {other}"
        );
    }

    #[test]
    fn test_message_key_serde_names() {
        for key in MessageKey::ALL {
            let json = serde_json::to_value(key).unwrap();
            assert_eq!(json, key.as_str());
        }
    }
}
