use crate::game::GameResult;
use crate::storage::SessionStats;

/// Win/loss/draw tallies and the loss streak for the current session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounters {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Consecutive losses since the last win or draw.
    pub streak: u32,
    /// Epoch milliseconds.
    pub session_start: i64,
    pub session_length_ms: i64,
}

impl SessionCounters {
    pub fn new(now_ms: i64, session_length_ms: i64) -> Self {
        Self {
            wins: 0,
            losses: 0,
            draws: 0,
            streak: 0,
            session_start: now_ms,
            session_length_ms,
        }
    }

    pub fn record(&mut self, result: GameResult) {
        match result {
            GameResult::Win => {
                self.wins += 1;
                self.streak = 0;
            }
            GameResult::Loss => {
                self.losses += 1;
                self.streak += 1;
            }
            GameResult::Draw => {
                self.draws += 1;
                self.streak = 0;
            }
        }
    }

    /// Whether the session window has run out at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.session_start) > self.session_length_ms
    }

    /// Start a new window at `now_ms` with everything zeroed.
    pub fn reset(&mut self, now_ms: i64) {
        *self = Self::new(now_ms, self.session_length_ms);
    }

    /// Zero the tallies and streak, keeping the window.
    pub fn clear_results(&mut self) {
        self.wins = 0;
        self.losses = 0;
        self.draws = 0;
        self.streak = 0;
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            win: self.wins,
            loss: self.losses,
            draw: self.draws,
        }
    }
}
