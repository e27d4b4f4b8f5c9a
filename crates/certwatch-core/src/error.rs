//! Error types for the certificate lifecycle core

use thiserror::Error;

/// Errors raised while reading certificate metadata or threshold settings
///
/// Classification and formatting never fail; a certificate with missing
/// dates is reported through its summary instead. These errors only cover
/// malformed input handed to the core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A timestamp was neither RFC 3339 nor a `YYYY-MM-DD` date
    #[error("Invalid timestamp '{value}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidTimestamp { value: String },

    /// A threshold day count was zero or too large to turn into an instant
    #[error("Threshold {name} out of range: {days} days")]
    ThresholdOutOfRange { name: &'static str, days: u32 },

    /// Certificate records could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        CoreError::InvalidTimestamp {
            value: value.into(),
        }
    }

    /// Create a threshold range error
    pub fn threshold_out_of_range(name: &'static str, days: u32) -> Self {
        CoreError::ThresholdOutOfRange { name, days }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
