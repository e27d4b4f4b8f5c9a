//! Certificate health classification
//!
//! Classification runs in two steps. The threshold check decides which
//! branch applies, with expiration taking precedence over age. The sign of
//! the relative day count then splits each branch into its final state.
//!
//! A missing date is compared as the UNIX epoch, so it always trips its
//! threshold; the branch then reports [`HealthState::Unknown`] because no
//! relative day count can be computed.

use crate::certificate::Certificate;
use crate::thresholds::{Threshold, Thresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived health of a certificate at one evaluation instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// `not_after` is today or in the past
    Expired,
    /// `not_after` is in the future but before the expiration threshold
    Expiring,
    /// `not_before` is old enough that rotation is due
    Aging,
    /// `not_before` is in the future
    Invalid,
    /// A threshold branch applied but its date is missing
    Unknown,
    /// Neither threshold applies
    Healthy,
}

impl HealthState {
    /// Whether this state should raise an alert
    pub fn is_alerting(&self) -> bool {
        !matches!(self, HealthState::Healthy)
    }

    /// The status label carried by this state, if any
    pub fn status(&self) -> Option<CertStatus> {
        match self {
            HealthState::Expired => Some(CertStatus::Expired),
            HealthState::Expiring => Some(CertStatus::Expiring),
            HealthState::Aging => Some(CertStatus::Aging),
            HealthState::Invalid => Some(CertStatus::Invalid),
            HealthState::Unknown | HealthState::Healthy => None,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Expired => write!(f, "expired"),
            HealthState::Expiring => write!(f, "expiring"),
            HealthState::Aging => write!(f, "aging"),
            HealthState::Invalid => write!(f, "invalid"),
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Healthy => write!(f, "healthy"),
        }
    }
}

/// Status attached to an alerting summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertStatus {
    Expired,
    Expiring,
    Aging,
    Invalid,
}

impl From<CertStatus> for HealthState {
    fn from(status: CertStatus) -> Self {
        match status {
            CertStatus::Expired => HealthState::Expired,
            CertStatus::Expiring => HealthState::Expiring,
            CertStatus::Aging => HealthState::Aging,
            CertStatus::Invalid => HealthState::Invalid,
        }
    }
}

/// Signed whole days from `date` to `now`
///
/// Non-negative when `date` is today or in the past. Partial days are
/// truncated toward zero.
pub fn relative_days(now: DateTime<Utc>, date: DateTime<Utc>) -> i64 {
    now.signed_duration_since(date).num_days()
}

/// Decide which threshold, if any, the certificate crossed
pub fn breached_threshold(cert: &Certificate, thresholds: &Thresholds) -> Option<Threshold> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    let is_expiring = cert.not_after.unwrap_or(epoch) < thresholds.expiration;
    let is_aging = cert.not_before.unwrap_or(epoch) < thresholds.aging;

    if is_expiring {
        Some(Threshold::Expiration)
    } else if is_aging {
        Some(Threshold::Age)
    } else {
        None
    }
}

/// Classify a certificate at `now`
pub fn classify(cert: &Certificate, thresholds: &Thresholds, now: DateTime<Utc>) -> HealthState {
    match breached_threshold(cert, thresholds) {
        Some(Threshold::Expiration) => match cert.not_after {
            Some(not_after) if relative_days(now, not_after) >= 0 => HealthState::Expired,
            Some(_) => HealthState::Expiring,
            None => HealthState::Unknown,
        },
        Some(Threshold::Age) => match cert.not_before {
            Some(not_before) if relative_days(now, not_before) >= 0 => HealthState::Aging,
            Some(_) => HealthState::Invalid,
            None => HealthState::Unknown,
        },
        None => HealthState::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn thresholds() -> Thresholds {
        // expiration: 2024-06-01, aging: 2021-01-01
        Thresholds::new(day(2024, 6, 1), day(2021, 1, 1))
    }

    #[test]
    fn test_relative_days_sign() {
        assert_eq!(relative_days(day(2024, 3, 1), day(2024, 1, 1)), 60);
        assert_eq!(relative_days(day(2023, 12, 1), day(2024, 1, 1)), -31);
        assert_eq!(relative_days(day(2024, 1, 1), day(2024, 1, 1)), 0);
    }

    #[test]
    fn test_relative_days_truncates_partial_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        assert_eq!(relative_days(now, day(2024, 1, 1)), 0);
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 1, 0, 0).unwrap();
        assert_eq!(relative_days(before, day(2024, 1, 1)), 0);
    }

    #[test]
    fn test_expired_certificate() {
        let cert = Certificate::new(Some(day(2020, 1, 1)), Some(day(2024, 1, 1)));
        assert_eq!(classify(&cert, &thresholds(), day(2024, 3, 1)), HealthState::Expired);
    }

    #[test]
    fn test_expiring_certificate() {
        let cert = Certificate::new(Some(day(2020, 1, 1)), Some(day(2024, 1, 1)));
        assert_eq!(classify(&cert, &thresholds(), day(2023, 12, 1)), HealthState::Expiring);
    }

    #[test]
    fn test_expiration_takes_precedence_over_age() {
        // not_before 2020-01-01 is also older than the aging threshold
        let cert = Certificate::new(Some(day(2020, 1, 1)), Some(day(2024, 1, 1)));
        assert_eq!(
            breached_threshold(&cert, &thresholds()),
            Some(Threshold::Expiration)
        );
    }

    #[test]
    fn test_aging_certificate() {
        let cert = Certificate::new(Some(day(2020, 1, 1)), Some(day(2030, 1, 1)));
        assert_eq!(breached_threshold(&cert, &thresholds()), Some(Threshold::Age));
        assert_eq!(classify(&cert, &thresholds(), day(2024, 3, 1)), HealthState::Aging);
    }

    #[test]
    fn test_not_yet_valid_certificate_is_invalid() {
        // aging threshold in the future so a future not_before still trips it
        let thresholds = Thresholds::new(day(2024, 6, 1), day(2026, 1, 1));
        let cert = Certificate::new(Some(day(2025, 1, 1)), Some(day(2030, 1, 1)));
        assert_eq!(classify(&cert, &thresholds, day(2024, 3, 1)), HealthState::Invalid);
    }

    #[test]
    fn test_healthy_certificate() {
        let cert = Certificate::new(Some(day(2023, 1, 1)), Some(day(2030, 1, 1)));
        assert_eq!(breached_threshold(&cert, &thresholds()), None);
        let state = classify(&cert, &thresholds(), day(2024, 3, 1));
        assert_eq!(state, HealthState::Healthy);
        assert!(!state.is_alerting());
        assert!(state.status().is_none());
    }

    #[test]
    fn test_missing_not_after_selects_expiration_branch() {
        let cert = Certificate::new(Some(day(2023, 1, 1)), None);
        assert_eq!(
            breached_threshold(&cert, &thresholds()),
            Some(Threshold::Expiration)
        );
        assert_eq!(classify(&cert, &thresholds(), day(2024, 3, 1)), HealthState::Unknown);
    }

    #[test]
    fn test_missing_not_before_selects_age_branch() {
        let cert = Certificate::new(None, Some(day(2030, 1, 1)));
        assert_eq!(breached_threshold(&cert, &thresholds()), Some(Threshold::Age));
        assert_eq!(classify(&cert, &thresholds(), day(2024, 3, 1)), HealthState::Unknown);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(HealthState::Expired.status(), Some(CertStatus::Expired));
        assert_eq!(HealthState::Unknown.status(), None);
        assert_eq!(HealthState::from(CertStatus::Invalid), HealthState::Invalid);
        assert!(HealthState::Unknown.is_alerting());
    }
}
