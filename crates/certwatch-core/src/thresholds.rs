//! Threshold settings and the absolute instants derived from them

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default number of days before `not_after` at which a certificate is expiring
pub const DEFAULT_EXPIRATION_THRESHOLD_DAYS: u32 = 30;

/// Default certificate age, in days, at which rotation is due
pub const DEFAULT_AGE_THRESHOLD_DAYS: u32 = 730;

/// Largest accepted threshold, in days (one hundred years)
pub const MAX_THRESHOLD_DAYS: u32 = 36_500;

/// User-facing TLS alerting settings, expressed in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    #[serde(default = "default_expiration_threshold_days")]
    pub expiration_threshold_days: u32,
    #[serde(default = "default_age_threshold_days")]
    pub age_threshold_days: u32,
}

fn default_expiration_threshold_days() -> u32 {
    DEFAULT_EXPIRATION_THRESHOLD_DAYS
}

fn default_age_threshold_days() -> u32 {
    DEFAULT_AGE_THRESHOLD_DAYS
}

impl TlsSettings {
    /// Check both day counts lie in `1..=MAX_THRESHOLD_DAYS`
    pub fn validate(&self) -> Result<()> {
        check_days("expiration_threshold_days", self.expiration_threshold_days)?;
        check_days("age_threshold_days", self.age_threshold_days)
    }
}

fn check_days(name: &'static str, days: u32) -> Result<()> {
    if days == 0 || days > MAX_THRESHOLD_DAYS {
        return Err(CoreError::threshold_out_of_range(name, days));
    }
    Ok(())
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            expiration_threshold_days: DEFAULT_EXPIRATION_THRESHOLD_DAYS,
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
        }
    }
}

/// Which of the two thresholds a certificate crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// `not_after` falls before the expiration threshold
    Expiration,
    /// `not_before` falls before the aging threshold
    Age,
}

/// Absolute instants certificate dates are compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Certificates ending before this instant are expiring
    pub expiration: DateTime<Utc>,
    /// Certificates starting before this instant are aging
    pub aging: DateTime<Utc>,
}

impl Thresholds {
    pub fn new(expiration: DateTime<Utc>, aging: DateTime<Utc>) -> Self {
        Self { expiration, aging }
    }

    /// Derive thresholds relative to `now`
    ///
    /// The expiration threshold lies `expiration_threshold_days` in the
    /// future, the aging threshold `age_threshold_days` in the past.
    /// Settings outside `1..=MAX_THRESHOLD_DAYS`, or instants that leave
    /// chrono's representable range, are rejected.
    pub fn from_settings(now: DateTime<Utc>, settings: &TlsSettings) -> Result<Self> {
        settings.validate()?;

        let expiration = now
            .checked_add_signed(Duration::days(i64::from(settings.expiration_threshold_days)))
            .ok_or_else(|| {
                CoreError::threshold_out_of_range(
                    "expiration_threshold_days",
                    settings.expiration_threshold_days,
                )
            })?;
        let aging = now
            .checked_sub_signed(Duration::days(i64::from(settings.age_threshold_days)))
            .ok_or_else(|| {
                CoreError::threshold_out_of_range("age_threshold_days", settings.age_threshold_days)
            })?;

        Ok(Self { expiration, aging })
    }
}
