//! Error types for bitsketch.
//!
//! Every fallible operation returns [`Result`], carrying a [`SketchError`]
//! with an [`ErrorCode`] that tells the caller which kind of failure occurred.
//! "Not found" is never an error here; lookups return `Option` instead.

use std::fmt;
use thiserror::Error;

/// Error codes for sketch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid argument or configuration value.
    InvalidArgument,
    /// A query was issued before the index was frozen.
    NotFrozen,
    /// A build-phase mutation was attempted after freeze.
    AlreadyFrozen,
    /// The pivot source could not supply the requested pivot pairs.
    PivotUnavailable,
    /// Reading or writing the bucket store failed.
    Storage,
    /// Persisted data is inconsistent (unresolvable ids, malformed payloads).
    CorruptIndex,
    /// The distance function failed.
    Metric,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCode::NotFrozen => write!(f, "NOT_FROZEN"),
            ErrorCode::AlreadyFrozen => write!(f, "ALREADY_FROZEN"),
            ErrorCode::PivotUnavailable => write!(f, "PIVOT_UNAVAILABLE"),
            ErrorCode::Storage => write!(f, "STORAGE"),
            ErrorCode::CorruptIndex => write!(f, "CORRUPT_INDEX"),
            ErrorCode::Metric => write!(f, "METRIC"),
        }
    }
}

/// Main error type for sketch operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct SketchError {
    code: ErrorCode,
    message: String,
}

impl SketchError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    // Convenience constructors

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, msg)
    }

    /// Create a not-frozen error.
    pub fn not_frozen(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFrozen, msg)
    }

    /// Create an already-frozen error.
    pub fn already_frozen(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyFrozen, msg)
    }

    /// Create a pivot-unavailable error.
    pub fn pivot_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PivotUnavailable, msg)
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Storage, msg)
    }

    /// Create a corrupt-index error.
    pub fn corrupt_index(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CorruptIndex, msg)
    }

    /// Create a metric error.
    pub fn metric(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Metric, msg)
    }

    /// Whether this error signals persisted-data corruption.
    pub fn is_corruption(&self) -> bool {
        self.code == ErrorCode::CorruptIndex
    }
}

impl From<std::io::Error> for SketchError {
    fn from(err: std::io::Error) -> Self {
        SketchError::storage(err.to_string())
    }
}

impl From<serde_json::Error> for SketchError {
    fn from(err: serde_json::Error) -> Self {
        SketchError::invalid_argument(format!("malformed JSON: {}", err))
    }
}

/// Result type alias for sketch operations.
pub type Result<T> = std::result::Result<T, SketchError>;
