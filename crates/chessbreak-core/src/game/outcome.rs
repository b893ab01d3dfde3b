use serde::{Deserialize, Serialize};

/// Outcome of a finished game from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::Win => "win",
            GameResult::Loss => "loss",
            GameResult::Draw => "draw",
        }
    }
}

/// Classify result-panel title text.
///
/// The panel reads "You Won!", "Draw" or "White Won"/"Black Won". Rules are
/// ordered: "draw" beats colour names. Anything unrecognised, including empty
/// text, counts as a win.
pub fn classify_result(text: &str) -> GameResult {
    let text = text.trim().to_lowercase();
    if text.contains("draw") {
        GameResult::Draw
    } else if text.contains("white") || text.contains("black") {
        GameResult::Loss
    } else {
        GameResult::Win
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_panel_titles() {
        assert_eq!(classify_result("You Won!"), GameResult::Win);
        assert_eq!(classify_result("White Won"), GameResult::Loss);
        assert_eq!(classify_result("  Black Won "), GameResult::Loss);
        assert_eq!(classify_result("Draw"), GameResult::Draw);
        assert_eq!(
            classify_result("Draw by agreement, black offered"),
            GameResult::Draw
        );
    }

    #[test]
    fn unparseable_text_defaults_to_win() {
        assert_eq!(classify_result(""), GameResult::Win);
        assert_eq!(classify_result("   "), GameResult::Win);
        assert_eq!(classify_result("Game Aborted"), GameResult::Win);
    }

    proptest! {
        #[test]
        fn draw_anywhere_wins_over_everything(
            prefix in ".{0,20}",
            suffix in ".{0,20}",
            upper in any::<bool>(),
        ) {
            let token = if upper { "DRAW" } else { "dRaW" };
            let text = format!("{prefix}{token}{suffix}");
            prop_assert_eq!(classify_result(&text), GameResult::Draw);
        }

        #[test]
        fn colour_without_draw_is_loss(
            prefix in "[a-z ]{0,12}",
            colour in prop::sample::select(vec!["white", "Black", "WHITE"]),
        ) {
            let text = format!("{prefix}{colour} won");
            prop_assume!(!text.to_lowercase().contains("draw"));
            prop_assert_eq!(classify_result(&text), GameResult::Loss);
        }

        #[test]
        fn other_text_is_win(text in "[0-9 !?.,]{0,30}") {
            prop_assert_eq!(classify_result(&text), GameResult::Win);
        }
    }
}
