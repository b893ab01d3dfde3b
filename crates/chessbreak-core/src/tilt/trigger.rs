//! Tilt trigger evaluation.
//!
//! Triggers are independent; any one firing is enough. The reason is kept for
//! logging only.

use std::fmt;

use crate::game::RatingTrack;
use crate::storage::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    LossStreak { streak: u32, max_losses: u32 },
    RatingDrop { drop: i32, threshold: i32 },
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::LossStreak { streak, max_losses } => {
                write!(f, "loss streak {streak} reached limit {max_losses}")
            }
            TriggerReason::RatingDrop { drop, threshold } => {
                write!(f, "rating dropped {drop} points (limit {threshold})")
            }
        }
    }
}

/// First trigger that fires for the given state, if any.
pub fn evaluate(options: &Options, streak: u32, rating: &RatingTrack) -> Option<TriggerReason> {
    if options.enable_tilt_mode && streak >= options.max_losses {
        return Some(TriggerReason::LossStreak {
            streak,
            max_losses: options.max_losses,
        });
    }

    if options.enable_rating_drop_trigger {
        if let Some(drop) = rating.session_drop() {
            if drop >= options.rating_drop_threshold {
                return Some(TriggerReason::RatingDrop {
                    drop,
                    threshold: options.rating_drop_threshold,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(start: i32, current: i32) -> RatingTrack {
        RatingTrack {
            current_rating: Some(current),
            session_rating_start: Some(start),
        }
    }

    #[test]
    fn streak_trigger_respects_flag() {
        let mut options = Options::default();
        assert!(matches!(
            evaluate(&options, 3, &RatingTrack::default()),
            Some(TriggerReason::LossStreak { streak: 3, .. })
        ));
        assert_eq!(evaluate(&options, 2, &RatingTrack::default()), None);
        options.enable_tilt_mode = false;
        assert_eq!(evaluate(&options, 9, &RatingTrack::default()), None);
    }

    #[test]
    fn rating_drop_needs_flag_and_both_ratings() {
        let mut options = Options::default();
        assert_eq!(evaluate(&options, 0, &rating(1500, 1440)), None);

        options.enable_rating_drop_trigger = true;
        assert_eq!(
            evaluate(&options, 0, &rating(1500, 1440)),
            Some(TriggerReason::RatingDrop {
                drop: 60,
                threshold: 50
            })
        );
        assert!(evaluate(&options, 0, &rating(1500, 1450)).is_some());
        assert_eq!(evaluate(&options, 0, &rating(1500, 1451)), None);

        let half_known = RatingTrack {
            current_rating: Some(1000),
            session_rating_start: None,
        };
        assert_eq!(evaluate(&options, 0, &half_known), None);
    }
}
