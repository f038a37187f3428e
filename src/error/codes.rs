//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Mapping errors
//! - 3xx: Config errors
//! - 6xx: Storage errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors
//!
//! Each code also carries an HTTP-style status hint so a boundary layer can
//! surface it without re-classifying the error.

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `MappingNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Mapping errors (1xx)
    // ========================================
    /// E101: No active mapping matches the requested key
    MappingNotFound,
    /// E102: The mapping's current state does not allow the transition
    InvalidTransition,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file has invalid syntax or values
    ConfigInvalid,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: Uniqueness, check or referential constraint rejected the write
    ConstraintViolation,
    /// E602: Any other read/write failure in the storage engine
    StorageFailure,
    /// E603: Payload could not be serialized or parsed
    SerializationError,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Caller input failed validation before reaching storage
    ValidationFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Filesystem operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric code.
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::MappingNotFound => 101,
            Self::InvalidTransition => 102,
            Self::ConfigInvalid => 301,
            Self::ConstraintViolation => 601,
            Self::StorageFailure => 602,
            Self::SerializationError => 603,
            Self::ValidationFailed => 801,
            Self::IoError => 901,
        }
    }

    /// Get the code string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// HTTP-style status a boundary layer should report for this code.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MappingNotFound => 404,
            Self::InvalidTransition => 409,
            Self::ValidationFailed => 400,
            Self::ConfigInvalid
            | Self::ConstraintViolation
            | Self::StorageFailure
            | Self::SerializationError
            | Self::IoError => 500,
        }
    }

    /// Get an actionable suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::MappingNotFound => "Check the order, test and sample number. Run `tsm list --order <id> --test <id> --include-deleted` to inspect history",
            Self::InvalidTransition => "Resolved draws cannot be rejected again. Create a new mapping with the next sample number",
            Self::ConfigInvalid => "Check TOML syntax in the config file and the TSM_* environment variables",
            Self::ConstraintViolation => "Another active mapping already occupies this draw slot, or the record breaks a column rule",
            Self::StorageFailure => "Check that the database path is writable and not locked by another process",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",
            Self::ValidationFailed => "Review the command arguments and retry",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Whether the caller can reasonably fix the problem and retry.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::MappingNotFound
            | Self::InvalidTransition
            | Self::ConfigInvalid
            | Self::ConstraintViolation
            | Self::ValidationFailed
            | Self::IoError => true,
            Self::StorageFailure | Self::SerializationError => false,
        }
    }

    /// Get the error category.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::MappingNotFound | Self::InvalidTransition => "mapping",
            Self::ConfigInvalid => "config",
            Self::ConstraintViolation | Self::StorageFailure | Self::SerializationError => {
                "storage"
            }
            Self::ValidationFailed => "validation",
            Self::IoError => "internal",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::MappingNotFound,
            Self::InvalidTransition,
            Self::ConfigInvalid,
            Self::ConstraintViolation,
            Self::StorageFailure,
            Self::SerializationError,
            Self::ValidationFailed,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
