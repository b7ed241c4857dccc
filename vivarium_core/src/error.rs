//! Error types for the vivarium_core library.

use chrono::{DateTime, Utc};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vivarium_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A new restriction period starts before the previous one
    #[error("restriction period starting {start} precedes the previous start {previous}")]
    UnorderedRestriction {
        start: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    /// A restriction period is still open; it must be closed first
    #[error("a restriction period opened {start} is still open")]
    RestrictionAlreadyOpen { start: DateTime<Utc> },

    /// No open restriction period to close (recoverable; callers may ignore)
    #[error("no open restriction period to close")]
    NoOpenRestriction,

    /// A date-bearing input was not a usable date/time value
    #[error("invalid date: {0}")]
    InvalidDate(String),
}
