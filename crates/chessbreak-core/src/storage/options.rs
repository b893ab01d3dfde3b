//! User-configurable tilt policy.
//!
//! Options are read-only for the state machine. Any subset of keys may be
//! present in the backing file; missing keys fall back to the defaults
//! below. Stored as camelCase TOML at `~/.config/chessbreak/options.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Loss streak that triggers a lockout.
    #[serde(default = "default_max_losses")]
    pub max_losses: u32,
    /// Base lockout length in minutes.
    #[serde(default = "default_timeout_duration")]
    pub timeout_duration: u32,
    /// Session window in minutes.
    #[serde(default = "default_session_length")]
    pub session_length: u32,
    #[serde(default = "default_true")]
    pub store_game_history: bool,
    /// Days of history kept.
    #[serde(default = "default_history_retention")]
    pub game_history_retention: u32,
    #[serde(default = "default_true")]
    pub show_notifications: bool,
    /// Zero session counters when a lockout ends.
    #[serde(default)]
    pub auto_reset_stats: bool,
    /// Enables the loss-streak trigger.
    #[serde(default = "default_true")]
    pub enable_tilt_mode: bool,
    #[serde(default)]
    pub enable_progressive_timeouts: bool,
    #[serde(default = "default_multiplier")]
    pub progressive_timeout_multiplier: f64,
    #[serde(default)]
    pub enable_rating_drop_trigger: bool,
    #[serde(default = "default_rating_drop_threshold")]
    pub rating_drop_threshold: i32,
    #[serde(default = "default_true")]
    pub track_rating_changes: bool,
}

fn default_max_losses() -> u32 {
    3
}
fn default_timeout_duration() -> u32 {
    5
}
fn default_session_length() -> u32 {
    5
}
fn default_history_retention() -> u32 {
    30
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_rating_drop_threshold() -> i32 {
    50
}
fn default_true() -> bool {
    true
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_losses: default_max_losses(),
            timeout_duration: default_timeout_duration(),
            session_length: default_session_length(),
            store_game_history: true,
            game_history_retention: default_history_retention(),
            show_notifications: true,
            auto_reset_stats: false,
            enable_tilt_mode: true,
            enable_progressive_timeouts: false,
            progressive_timeout_multiplier: default_multiplier(),
            enable_rating_drop_trigger: false,
            rating_drop_threshold: default_rating_drop_threshold(),
            track_rating_changes: true,
        }
    }
}

impl Options {
    /// Base lockout length in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        u64::from(self.timeout_duration) * 60_000
    }

    /// Session window in milliseconds.
    pub fn session_length_ms(&self) -> i64 {
        i64::from(self.session_length) * 60_000
    }

    /// Take the scalars an options change may alter at runtime. Everything
    /// else keeps its start-up value.
    pub fn refresh_policy(&mut self, fresh: &Options) {
        self.max_losses = fresh.max_losses;
        self.session_length = fresh.session_length;
        self.timeout_duration = fresh.timeout_duration;
    }
}

/// Where options come from.
pub trait OptionsSource {
    fn load_options(&self) -> Result<Options, ConfigError>;
}

impl OptionsSource for Options {
    fn load_options(&self) -> Result<Options, ConfigError> {
        Ok(self.clone())
    }
}

/// Options persisted as a TOML file.
#[derive(Debug, Clone)]
pub struct OptionsFile {
    path: PathBuf,
}

impl OptionsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `options.toml` in the data directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(data_dir()?.join("options.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load from disk, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Options, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Options::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self, options: &Options) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: self.path.clone(),
            message,
        };
        let content = toml::to_string_pretty(options).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get an option value as string by its camelCase key.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let json = to_json(&self.load()?)?;
        Ok(json.get(key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Set one option by key and persist. Returns the updated options.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value does not parse as
    /// the option's type, or the file cannot be written.
    pub fn set(&self, key: &str, value: &str) -> Result<Options, ConfigError> {
        let mut json = to_json(&self.load()?)?;
        set_json_value(&mut json, key, value)?;
        let options: Options =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        self.save(&options)?;
        Ok(options)
    }
}

impl OptionsSource for OptionsFile {
    fn load_options(&self) -> Result<Options, ConfigError> {
        self.load()
    }
}

fn to_json(options: &Options) -> Result<serde_json::Value, ConfigError> {
    serde_json::to_value(options).map_err(|e| ConfigError::InvalidValue {
        key: String::new(),
        message: e.to_string(),
    })
}

fn set_json_value(root: &mut serde_json::Value, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };
    let obj = root
        .as_object_mut()
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let existing = obj
        .get(key)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

    let new_value = match existing {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            value
                .parse::<bool>()
                .map_err(|e| invalid(e.to_string()))?,
        ),
        serde_json::Value::Number(n) if n.is_f64() => value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
        serde_json::Value::Number(_) => value
            .parse::<i64>()
            .map(|n| serde_json::Value::Number(n.into()))
            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
        _ => serde_json::Value::String(value.into()),
    };

    obj.insert(key.to_string(), new_value);
    Ok(())
}
