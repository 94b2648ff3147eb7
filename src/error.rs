//! Unified error handling for the vnexsus crate
//!
//! Nothing in the matching and scoring core is fatal: malformed dates are
//! dropped where they are found (see [`DateError`]) and empty reference sets
//! follow the vacuous-target convention. The [`Error`] type covers the
//! remaining failure surface: configuration, document decoding, missing case
//! inputs in a batch and task joins in the parallel runner.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vnexsus::error::{Error, ErrorCategory};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "case skipped: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid or unreadable configuration
    Config,
    /// Extraction or reference document could not be decoded
    Document,
    /// Case input missing from a batch entry
    Input,
    /// File system errors
    Storage,
    /// Worker task failures in the parallel batch runner
    Runtime,
}

impl ErrorCategory {
    /// Get Korean description for the category
    pub fn korean_desc(&self) -> &'static str {
        match self {
            Self::Config => "설정 오류",
            Self::Document => "문서 형식 오류",
            Self::Input => "입력 누락",
            Self::Storage => "저장소 오류",
            Self::Runtime => "실행 오류",
        }
    }
}

/// Unified error type for the vnexsus crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value
    #[error("Invalid config '{field}' = '{value}': {reason}")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    /// Case has no extraction document
    #[error("Extraction document missing for case '{case_id}'")]
    MissingExtraction { case_id: String },

    /// Case has no reference (ground truth) document
    #[error("Reference document missing for case '{case_id}'")]
    MissingReference { case_id: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Parallel worker failed to complete
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if the batch can continue past this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingExtraction { .. } | Self::MissingReference { .. } => true,
            Self::Json(_) | Self::Io(_) => true,
            Self::InvalidConfig { .. } | Self::Toml(_) => false,
            Self::Task(_) => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. } | Self::Toml(_) => ErrorCategory::Config,
            Self::Json(_) => ErrorCategory::Document,
            Self::MissingExtraction { .. } | Self::MissingReference { .. } => ErrorCategory::Input,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Task(_) => ErrorCategory::Runtime,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Why a date-looking string was rejected
///
/// These never reach the caller of the scanners; OCR noise routinely
/// produces numeric runs that look like dates, so candidates failing here
/// are dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// No supported date format matched
    #[error("Unrecognized date format: '{0}'")]
    Unrecognized(String),

    /// Month or day outside the calendar (e.g. 2024-02-30)
    #[error("Invalid calendar date: {year}-{month:02}-{day:02}")]
    InvalidCalendar { year: i32, month: u32, day: u32 },

    /// Year outside the plausible window
    #[error("Year {year} outside plausible window {min}-{max}")]
    OutOfWindow { year: i32, min: i32, max: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_are_recoverable() {
        let err = Error::MissingReference {
            case_id: "Case10".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.to_string().contains("Case10"));
    }

    #[test]
    fn test_invalid_config_not_recoverable() {
        let err = Error::invalid_config("date_tolerance_days", -1, "Must not be negative");
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.category().korean_desc(), "설정 오류");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Document);
    }

    #[test]
    fn test_date_error_display() {
        let err = DateError::InvalidCalendar {
            year: 2024,
            month: 2,
            day: 30,
        };
        assert_eq!(err.to_string(), "Invalid calendar date: 2024-02-30");
    }
}
