//! Core error types for linguapace-core.
//!
//! Only `ValidationError` is ever surfaced to the caller of an engine command.
//! Evaluator and storage failures are absorbed by the engines (logged and
//! degraded to "not recorded"), but the types are public so evaluator and
//! store implementations can report them. `CoreError` is what hosts return
//! when wiring engines to files, config and storage.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for linguapace-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid settings or arguments
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// History storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors reported by an [`ExerciseEvaluator`](crate::practice::ExerciseEvaluator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorError {
    /// No evaluator registered for this exercise kind
    #[error("No evaluator registered for exercise kind '{kind}'")]
    Unsupported { kind: String },

    /// The answer does not have the shape this kind expects
    #[error("Answer shape not accepted by '{kind}': {message}")]
    AnswerShape { kind: String, message: String },

    /// Any other evaluator failure
    #[error("Evaluation failed: {0}")]
    Failed(String),
}

/// History storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open history database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("History database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt history row: {0}")]
    Corrupt(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message_names_field() {
        let err = ValidationError::invalid("duration_seconds", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'duration_seconds': must be greater than 0"
        );
    }

    #[test]
    fn core_error_wraps_validation() {
        let err: CoreError = ValidationError::invalid("items", "none given").into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn core_error_wraps_config_and_json() {
        let err: CoreError = ConfigError::UnknownKey("practice.nope".into()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown configuration key: practice.nope"
        );

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(CoreError::from(json), CoreError::Json(_)));
    }

    #[test]
    fn rusqlite_errors_become_query_failures() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::QueryFailed(_)));
    }
}
