//! What happens on the board: who is playing, when games start and end, and
//! how each one turned out.

mod history;
mod identity;
mod lifecycle;
mod outcome;
mod rating;

pub use history::{GameHistory, OutcomeRecord, Players};
pub use identity::PlayerIdentity;
pub use lifecycle::{GamePhase, LifecycleDetector, LifecycleEvent};
pub use outcome::{classify_result, GameResult};
pub use rating::{RatingExtractor, RatingTrack, SignedDeltaScanner};
