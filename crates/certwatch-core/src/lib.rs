//! Certwatch core
//!
//! Decision logic that turns already-parsed TLS certificate metadata into
//! alert content.
//!
//! ## Architecture
//!
//! 1. **Certificate** (`certificate`): validity window, identity and the
//!    monitor context the certificate was observed from.
//!
//! 2. **Thresholds** (`thresholds`): day-based settings and the absolute
//!    instants derived from them.
//!
//! 3. **Classifier** (`classifier`): threshold check with expiration taking
//!    precedence over age, then the past/future split into a [`HealthState`].
//!
//! 4. **Formatter** (`formatter`): summary text and status label, plus the
//!    [`CertSummary`] payload consumed by alert notifications.
//!
//! 5. **Localizer** (`localizer`): date rendering and message templates.
//!
//! Everything here is pure and synchronous; the same inputs always produce
//! the same summary.
//!
//! ## Example
//!
//! ```rust
//! use certwatch_core::{get_cert_summary, parse_timestamp, Certificate, TemplateLocalizer, Thresholds};
//!
//! let cert = Certificate::new(
//!     Some(parse_timestamp("2020-01-01").unwrap()),
//!     Some(parse_timestamp("2024-01-01").unwrap()),
//! )
//! .with_common_name("api.example.com");
//!
//! let thresholds = Thresholds::new(
//!     parse_timestamp("2024-06-01").unwrap(),
//!     parse_timestamp("2021-01-01").unwrap(),
//! );
//! let now = parse_timestamp("2024-03-01").unwrap();
//!
//! let summary = get_cert_summary(&cert, &thresholds, now, &TemplateLocalizer::english());
//! assert_eq!(summary.status, "expired");
//! assert_eq!(summary.summary, "Expired on Jan 1, 2024 UTC, 60 days ago.");
//! ```

pub mod certificate;
pub mod classifier;
pub mod error;
pub mod formatter;
pub mod localizer;
pub mod thresholds;

pub use certificate::{parse_timestamp, Certificate};
pub use classifier::{breached_threshold, classify, relative_days, CertStatus, HealthState};
pub use error::{CoreError, Result};
pub use formatter::{
    format_valid_after, format_valid_before, get_cert_summary, status_label, CertSummary,
    TlsContent, MISSING_NOT_AFTER_SUMMARY, MISSING_NOT_BEFORE_SUMMARY,
};
pub use localizer::{Localizer, MessageKey, TemplateLocalizer, DEFAULT_DATE_FORMAT};
pub use thresholds::{
    Threshold, Thresholds, TlsSettings, DEFAULT_AGE_THRESHOLD_DAYS,
    DEFAULT_EXPIRATION_THRESHOLD_DAYS, MAX_THRESHOLD_DAYS,
};
