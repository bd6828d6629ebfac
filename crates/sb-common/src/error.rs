//! Error types for signal-bias analysis.
//!
//! Only malformed input and broken configuration are errors. Data-quality
//! outcomes (thin samples, degenerate corpora, failed sanity checks) are
//! ordinary result values and never surface here.
//!
//! Errors serialize to structured JSON for machine consumers:
//! ```json
//! {
//!   "code": 20,
//!   "category": "corpus",
//!   "message": "invalid site record at index 3: confidence 1.4 outside [0, 1]",
//!   "recoverable": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for signal-bias operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Analysis configuration errors.
    Config,
    /// Malformed site records or corpus shape.
    Corpus,
    /// Internal analysis failures.
    Analysis,
    /// Serialization and I/O at the corpus boundary.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Corpus => write!(f, "corpus"),
            ErrorCategory::Analysis => write!(f, "analysis"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for signal-bias analysis.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Corpus errors (20-29)
    #[error("invalid site record at index {index}: {reason}")]
    InvalidSite { index: usize, reason: String },

    #[error("duplicate site identifier: {url}")]
    DuplicateSite { url: String },

    #[error("invalid signal key: {0}")]
    InvalidSignalKey(String),

    // Analysis errors (30-39)
    #[error("analysis failed: {0}")]
    Analysis(String),

    // I/O errors (40-49)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error code, grouped by category:
    /// - 10-19: configuration
    /// - 20-29: corpus
    /// - 30-39: analysis
    /// - 40-49: I/O
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSite { .. } => 20,
            Error::DuplicateSite { .. } => 21,
            Error::InvalidSignalKey(_) => 22,
            Error::Analysis(_) => 30,
            Error::Io(_) => 40,
            Error::Json(_) => 41,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::InvalidSite { .. } | Error::DuplicateSite { .. } | Error::InvalidSignalKey(_) => {
                ErrorCategory::Corpus
            }
            Error::Analysis(_) => ErrorCategory::Analysis,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether fixing the input and re-running can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidSite { .. } | Error::DuplicateSite { .. } => true,
            Error::InvalidSignalKey(_) => true,
            // Internal defect; re-running on the same input fails the same way.
            Error::Analysis(_) => false,
            Error::Io(_) | Error::Json(_) => true,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();
        match err {
            Error::InvalidSite { index, .. } => {
                context.insert("index".to_string(), serde_json::json!(index));
            }
            Error::DuplicateSite { url } => {
                context.insert("url".to_string(), serde_json::json!(url));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(
            Error::InvalidSite {
                index: 0,
                reason: "empty url".into()
            }
            .code(),
            20
        );
        assert_eq!(Error::Analysis("x".into()).code(), 30);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::DuplicateSite { url: "a".into() }.category(),
            ErrorCategory::Corpus
        );
        assert_eq!(Error::Config("v".into()).category(), ErrorCategory::Config);
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(Error::from(json_err).category(), ErrorCategory::Io);
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::DuplicateSite {
            url: "https://a.example".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 21);
        assert!(structured.recoverable);
        assert_eq!(
            structured.context.get("url"),
            Some(&serde_json::json!("https://a.example"))
        );
        let json = structured.to_json();
        assert!(json.contains("\"category\":\"corpus\""));
    }

    #[test]
    fn analysis_errors_are_not_recoverable() {
        assert!(!Error::Analysis("nan".into()).is_recoverable());
    }
}
