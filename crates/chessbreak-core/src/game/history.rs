use serde::{Deserialize, Serialize};

use super::outcome::GameResult;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Names as displayed when the game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Players {
    pub top: String,
    pub bottom: String,
    pub username: String,
}

/// One completed game the viewer took part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub result: GameResult,
    pub reason: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub players: Players,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_change: Option<i32>,
}

/// Ordered game history, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameHistory {
    entries: Vec<OutcomeRecord>,
}

impl GameHistory {
    pub fn new(entries: Vec<OutcomeRecord>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, record: OutcomeRecord) {
        self.entries.push(record);
    }

    /// Drop records older than `retention_days` relative to `now_ms`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now_ms: i64, retention_days: u32) -> usize {
        let cutoff = now_ms.saturating_sub(i64::from(retention_days).saturating_mul(DAY_MS));
        let before = self.entries.len();
        self.entries.retain(|r| r.timestamp >= cutoff);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[OutcomeRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
