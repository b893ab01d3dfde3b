//! Persisted session state.
//!
//! The snapshot is always written whole: every key in one `set_many`, so
//! overlapping writers settle on the last complete snapshot instead of a mix
//! of fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::KvStore;
use crate::error::StorageError;
use crate::game::{GameHistory, RatingTrack};

/// Storage keys shared with the popup and options surfaces.
pub mod keys {
    pub const SESSION_STATS: &str = "sessionStats";
    pub const STREAK: &str = "chessBreakStreak";
    pub const SESSION_START: &str = "chessBreakSessionStart";
    pub const SESSION_LENGTH: &str = "chessBreakSessionLength";
    pub const CURRENT_TIMEOUT: &str = "currentTimeout";
    pub const CURRENT_TIMEOUT_START: &str = "currentTimeoutStart";
    pub const GAME_HISTORY: &str = "gameHistory";
    pub const TOTAL_TILT_COUNT: &str = "totalTiltCount";
    pub const CURRENT_RATING: &str = "currentRating";
    pub const SESSION_RATING_START: &str = "sessionRatingStart";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub loss: u32,
    #[serde(default)]
    pub draw: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub stats: SessionStats,
    pub streak: u32,
    /// Epoch milliseconds; `None` when no session was ever started.
    pub session_start: Option<i64>,
    /// Minutes.
    pub session_length: u32,
    /// Length of the last lockout in milliseconds.
    pub timeout_ms: u64,
    /// Epoch milliseconds the last lockout began; `None` when there is none.
    pub timeout_start: Option<i64>,
    pub history: GameHistory,
    pub total_tilt_count: u32,
    pub rating: RatingTrack,
}

impl SessionSnapshot {
    /// Read every key, defaulting the ones that are absent. Values that do
    /// not parse are logged and treated as absent; store I/O failures are
    /// returned.
    pub fn load(store: &dyn KvStore) -> Result<Self, StorageError> {
        Ok(Self {
            stats: read(store, keys::SESSION_STATS)?.unwrap_or_default(),
            streak: read(store, keys::STREAK)?.unwrap_or_default(),
            session_start: read(store, keys::SESSION_START)?,
            session_length: read(store, keys::SESSION_LENGTH)?.unwrap_or_default(),
            timeout_ms: read(store, keys::CURRENT_TIMEOUT)?.unwrap_or_default(),
            timeout_start: read::<i64>(store, keys::CURRENT_TIMEOUT_START)?.filter(|&t| t > 0),
            history: Self::load_history(store)?,
            total_tilt_count: read(store, keys::TOTAL_TILT_COUNT)?.unwrap_or_default(),
            rating: RatingTrack {
                current_rating: read(store, keys::CURRENT_RATING)?,
                session_rating_start: read(store, keys::SESSION_RATING_START)?,
            },
        })
    }

    pub fn load_history(store: &dyn KvStore) -> Result<GameHistory, StorageError> {
        Ok(read(store, keys::GAME_HISTORY)?.unwrap_or_default())
    }

    /// Every key with its JSON value.
    pub fn entries(&self) -> Result<Vec<(&'static str, Value)>, StorageError> {
        let history = serde_json::to_value(&self.history).map_err(|e| StorageError::Malformed {
            key: keys::GAME_HISTORY.to_string(),
            message: e.to_string(),
        })?;
        Ok(vec![
            (
                keys::SESSION_STATS,
                serde_json::json!({
                    "win": self.stats.win,
                    "loss": self.stats.loss,
                    "draw": self.stats.draw,
                }),
            ),
            (keys::STREAK, Value::from(self.streak)),
            (keys::SESSION_START, Value::from(self.session_start)),
            (keys::SESSION_LENGTH, Value::from(self.session_length)),
            (keys::CURRENT_TIMEOUT, Value::from(self.timeout_ms)),
            (keys::CURRENT_TIMEOUT_START, Value::from(self.timeout_start.unwrap_or(0))),
            (keys::GAME_HISTORY, history),
            (keys::TOTAL_TILT_COUNT, Value::from(self.total_tilt_count)),
            (keys::CURRENT_RATING, Value::from(self.rating.current_rating)),
            (keys::SESSION_RATING_START, Value::from(self.rating.session_rating_start)),
        ])
    }

    pub fn persist(&self, store: &mut dyn KvStore) -> Result<(), StorageError> {
        store.set_many(&self.entries()?)
    }
}

fn read<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StorageError> {
    let stored = match store.get(key) {
        Ok(stored) => stored,
        Err(StorageError::Malformed { message, .. }) => {
            warn!(key, "Ignoring unreadable stored value: {message}");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    match stored {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(key, "Ignoring malformed stored value: {e}");
                Ok(None)
            }
        },
    }
}
