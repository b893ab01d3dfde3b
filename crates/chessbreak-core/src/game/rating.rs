//! Rating delta extraction and session rating tracking.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::page::PageNode;

/// Strategy for pulling a signed rating change out of a result panel.
pub trait RatingExtractor {
    fn extract(&self, panel: &PageNode) -> Option<i32>;
}

/// Scans the panel's text nodes in document order and takes the first
/// `+N` / `-N` token that is not glued to a preceding digit (so a "1-0"
/// score line is not read as a delta).
pub struct SignedDeltaScanner {
    pattern: Regex,
}

impl SignedDeltaScanner {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?:^|[^0-9])([+\-\x{2212}][0-9]+)")
                .expect("valid rating delta regex"),
        }
    }

    fn scan(&self, text: &str) -> Option<i32> {
        self.pattern.captures_iter(text).find_map(|caps| {
            caps.get(1)
                .and_then(|m| m.as_str().replace('\u{2212}', "-").parse::<i32>().ok())
        })
    }
}

impl Default for SignedDeltaScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RatingExtractor for SignedDeltaScanner {
    fn extract(&self, panel: &PageNode) -> Option<i32> {
        panel.text_nodes().into_iter().find_map(|t| self.scan(t))
    }
}

/// Rating as seen across the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingTrack {
    pub current_rating: Option<i32>,
    pub session_rating_start: Option<i32>,
}

impl RatingTrack {
    /// Record an absolute rating shown on the page.
    pub fn observe(&mut self, rating: i32) {
        self.current_rating = Some(rating);
        self.session_rating_start.get_or_insert(rating);
    }

    /// Accumulate a detected delta. Returns the updated rating, or `None`
    /// when no baseline is known yet.
    pub fn apply_delta(&mut self, delta: i32) -> Option<i32> {
        let base = self.current_rating.or(self.session_rating_start)?;
        self.session_rating_start.get_or_insert(base);
        let updated = base.saturating_add(delta);
        self.current_rating = Some(updated);
        Some(updated)
    }

    /// Points lost since the session started (negative when gained).
    pub fn session_drop(&self) -> Option<i32> {
        Some(self.session_rating_start? - self.current_rating?)
    }

    /// Start a new session from the current rating. Without a known
    /// current rating the old baseline is kept.
    pub fn rebaseline(&mut self) {
        if let Some(current) = self.current_rating {
            self.session_rating_start = Some(current);
        }
    }
}
