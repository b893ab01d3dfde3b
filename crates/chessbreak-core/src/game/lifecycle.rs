//! Game lifecycle detection.
//!
//! Mutation batches are noisy: the result panel can arrive as the inserted
//! node itself or nested inside a wrapper, and the same panel may be
//! re-inserted by later batches. The detector turns that stream into at most
//! one `GameStarted` and one `GameEnded` per game.
//!
//! ```text
//! NotStarted -> InProgress -> Ended -> InProgress -> ...
//!      \______________________/^
//!       (panel already on screen at injection)
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::page::{markers, MutationBatch, Page, PageNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    NotStarted,
    InProgress,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    GameStarted,
    /// A result panel appeared; carries the panel subtree.
    GameEnded(PageNode),
}

#[derive(Debug, Clone)]
pub struct LifecycleDetector {
    phase: GamePhase,
    /// Set on `Ended`; cleared once the in-game affordances have been seen
    /// gone, so leftovers of the finished game cannot restart it.
    awaiting_clear: bool,
}

impl Default for LifecycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleDetector {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::NotStarted,
            awaiting_clear: false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Evaluate one mutation batch against the live page.
    pub fn observe(&mut self, batch: &MutationBatch, page: &dyn Page) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();

        if self.phase != GamePhase::InProgress {
            let active = page.has_active_game_controls();
            if !active {
                self.awaiting_clear = false;
            } else if !self.awaiting_clear {
                self.phase = GamePhase::InProgress;
                events.push(LifecycleEvent::GameStarted);
            }
        }

        if let Some(panel) = find_result_panel(&batch.added) {
            if self.phase == GamePhase::Ended {
                debug!("Result panel seen again for a finished game, ignoring");
            } else {
                events.push(LifecycleEvent::GameEnded(panel.clone()));
                self.phase = GamePhase::Ended;
                self.awaiting_clear = true;
            }
        }

        if find_result_panel(&batch.removed).is_some() {
            debug!("Result panel dismissed");
        }

        events
    }
}

/// First result panel among `nodes`, either a node itself or nested in one.
fn find_result_panel(nodes: &[PageNode]) -> Option<&PageNode> {
    nodes
        .iter()
        .find_map(|n| n.find_inclusive(markers::RESULT_PANEL))
}
