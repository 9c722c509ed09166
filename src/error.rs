//! Error types for async-listing
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for async-listing
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Pagination Errors
    // ============================================================================
    #[error("Invalid {field} {value} - should be >= {min}")]
    Validation {
        field: String,
        value: u64,
        min: u64,
    },

    #[error("{message}")]
    Usage { message: String },

    #[error("Cannot call {method} until pagination type has been inferred (after call to set_response)")]
    NotInferred { method: String },

    #[error("Could not infer paginator type from response")]
    InferenceFailed,

    // ============================================================================
    // Invocation Errors
    // ============================================================================
    #[error("Async action failed: {0}")]
    Action(Arc<Error>),

    #[error("run() was called after the runner was disposed. This has no effect")]
    Disposed,

    #[error("Async action was dropped before it settled")]
    Cancelled,

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for a value below its minimum
    pub fn validation(field: impl Into<String>, value: u64, min: u64) -> Self {
        Self::Validation {
            field: field.into(),
            value,
            min,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Usage error for a method that requires a specific paginator type
    pub fn only_valid_for(method: &str, required: impl std::fmt::Display) -> Self {
        Self::usage(format!("{method} is only valid for {required}"))
    }

    /// Usage error for a method that a paginator type does not support
    pub fn not_valid_for(method: &str, kind: impl std::fmt::Display) -> Self {
        Self::usage(format!("{method} is not valid for {kind}"))
    }

    /// Create a not-yet-inferred error
    pub fn not_inferred(method: impl Into<String>) -> Self {
        Self::NotInferred {
            method: method.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Whether this is a fatal configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
                | Error::JsonParse(_)
        )
    }

    /// Whether this error came from a rejected state mutation
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Whether this error came from calling a paginator method out of turn
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Usage { .. } | Error::NotInferred { .. } | Error::InferenceFailed
        )
    }

    /// The error an action rejected with, if this wraps one
    pub fn action_error(&self) -> Option<&Error> {
        match self {
            Error::Action(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Result type alias for async-listing
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::validation("page", 0, 1);
        assert_eq!(err.to_string(), "Invalid page 0 - should be >= 1");

        let err = Error::only_valid_for("set_limit()", "LimitOffsetPaginator");
        assert_eq!(
            err.to_string(),
            "set_limit() is only valid for LimitOffsetPaginator"
        );

        let err = Error::not_inferred("next()");
        assert!(err.to_string().starts_with("Cannot call next()"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::config("x").is_configuration());
        assert!(Error::invalid_value("trigger", "x").is_configuration());
        assert!(Error::validation("limit", 0, 1).is_validation());
        assert!(Error::usage("x").is_usage());
        assert!(Error::not_inferred("first()").is_usage());
        assert!(Error::InferenceFailed.is_usage());

        assert!(!Error::Disposed.is_usage());
        assert!(!Error::http_status(500, "").is_configuration());
    }

    #[test]
    fn test_action_error_unwraps_inner() {
        let err = Error::Action(Arc::new(Error::http_status(404, "Not found")));
        assert_eq!(
            err.action_error().map(ToString::to_string),
            Some("HTTP 404: Not found".to_string())
        );
        assert!(Error::Cancelled.action_error().is_none());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
