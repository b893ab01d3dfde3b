mod database;
mod options;
mod session;

pub use database::Database;
pub use options::{Options, OptionsFile, OptionsSource};
pub use session::{keys, SessionSnapshot, SessionStats};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{ConfigError, StorageError};

/// Returns `~/.config/chessbreak[-dev]/` based on CHESSBREAK_ENV.
///
/// Set CHESSBREAK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CHESSBREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("chessbreak-dev")
    } else {
        base_dir.join("chessbreak")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::NoDataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Durable key/value storage holding JSON values.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Write every entry or none of them.
    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StorageError>;
}

/// Process-local [`KvStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
