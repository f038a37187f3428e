//! Error handling for tsm.
//!
//! This module provides:
//! - [`TsmError`]: The main error enum for all mapping operations
//! - [`ErrorCode`]: Standardized error codes with HTTP-style status hints
//! - [`StructuredError`]: Serializable error for JSON output
//!
//! Storage-engine errors never escape as-is: `From<rusqlite::Error>` sorts
//! them into `NotFound`, `ConstraintViolation` or `StorageFailure`.

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for tsm operations.
#[derive(Error, Debug)]
pub enum TsmError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Mapping {id} is {state}; cannot {action}")]
    InvalidTransition {
        id: i64,
        state: String,
        action: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for TsmError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound(err.to_string()),
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(err.to_string())
            }
            // the statement text can be arbitrarily large; keep only the diagnosis
            rusqlite::Error::SqlInputError { msg, offset, .. } => {
                Self::StorageFailure(format!("{msg} (at offset {offset})"))
            }
            _ => Self::StorageFailure(err.to_string()),
        }
    }
}

impl TsmError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::MappingNotFound,
            Self::ConstraintViolation(_) => ErrorCode::ConstraintViolation,
            Self::StorageFailure(_) => ErrorCode::StorageFailure,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
        }
    }

    /// HTTP-style status hint for the boundary layer.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Whether this is the first-class "nothing matched" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::InvalidTransition { id, state, action } => Some(serde_json::json!({
                "mapping_id": id,
                "state": state,
                "action": action,
            })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_tsm_error(self)
    }
}

/// A structured error with machine-readable code, status hint and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "MAPPING_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// HTTP-style status hint (404, 409, 500, ...)
    pub http_status: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the caller
    pub recoverable: bool,

    /// Error category (e.g., "mapping", "storage")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            http_status: code.http_status(),
            message: message.into(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
        }
    }

    /// Create a structured error from a `TsmError`.
    #[must_use]
    pub fn from_tsm_error(err: &TsmError) -> Self {
        let mut structured = Self::new(err.code(), err.to_string());
        structured.context = err.context();
        structured
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&TsmError> for StructuredError {
    fn from(err: &TsmError) -> Self {
        Self::from_tsm_error(err)
    }
}

/// Result type alias using `TsmError`.
pub type Result<T> = std::result::Result<T, TsmError>;
