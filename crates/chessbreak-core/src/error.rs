//! Core error types for chessbreak-core.
//!
//! This module defines the error hierarchy using thiserror. Only start-up
//! preconditions surface as hard errors; storage and options failures inside
//! the running state machine are logged and degraded instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for chessbreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The viewer's handle could not be read from the page.
    #[error("Viewer identity not found on page")]
    IdentityUnresolved,

    /// The page is not one the monitor knows how to observe.
    #[error("Unsupported page: {0}")]
    UnsupportedPage(String),

    /// Persistent storage errors
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
}

/// Key/value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value did not have the expected shape
    #[error("Malformed value for '{key}': {message}")]
    Malformed { key: String, message: String },

    /// The store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load options from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save options to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid value for option '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown option key
    #[error("Unknown option: {0}")]
    UnknownKey(String),

    /// Could not determine where options live
    #[error("No data directory available: {0}")]
    NoDataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
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
