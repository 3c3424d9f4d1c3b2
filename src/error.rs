//! Error types for tasktrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (blank title, unknown id, bad import, bad args/config)
//! - 4: Operation failed (storage, lock, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasktrack CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasktrack operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(u64),

    #[error("Import rejected: {0}")]
    Import(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Operation failures (exit code 4)
    #[error("Storage I/O error at {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot at {path} is corrupt: {source}")]
    StorageCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::Validation(_)
            | Error::NotFound(_)
            | Error::Import(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::StorageIo { .. }
            | Error::StorageCorruption { .. }
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Import(_) => "import",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidConfig(_) => "invalid_config",
            Error::StorageIo { .. } | Error::Io(_) => "storage_io",
            Error::StorageCorruption { .. } => "storage_corruption",
            Error::LockFailed(_) => "lock_failed",
            Error::Json(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => "serialization",
        }
    }

    pub(crate) fn storage_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageIo {
            path: path.into(),
            source,
        }
    }

    /// Structured details for the JSON error envelope, when any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::StorageIo { path, .. }
            | Error::StorageCorruption { path, .. }
            | Error::LockFailed(path) => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for tasktrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
