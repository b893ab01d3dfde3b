pub mod clear;
pub mod options;
pub mod record;
pub mod stats;

use chessbreak_core::page::markers;
use chessbreak_core::{DocumentPage, PageNode};

/// URL given to pages built by the CLI.
pub const BOARD_URL: &str = "https://www.chess.com/play/online";

/// A board page with `viewer` signed in, playing `opponent` from the bottom
/// seat, with the sidebar new-game button present.
pub fn board(viewer: &str, opponent: &str, rating: Option<i32>) -> DocumentPage {
    let mut me = PageNode::with_class(markers::PLAYER_BLOCK)
        .child(PageNode::with_class(markers::PLAYER_USERNAME).text(viewer));
    if let Some(rating) = rating {
        me = me.child(PageNode::with_class(markers::PLAYER_RATING).text(&format!("({rating})")));
    }
    let them = PageNode::with_class(markers::PLAYER_BLOCK)
        .child(PageNode::with_class(markers::PLAYER_USERNAME).text(opponent));

    DocumentPage::new(
        PageNode::new()
            .child(
                PageNode::new()
                    .attr("id", markers::IDENTITY_ELEMENT_ID)
                    .attr(markers::IDENTITY_ATTRIBUTE, viewer),
            )
            .child(them)
            .child(me)
            .child(PageNode::with_class("new-game-buttons-buttons")),
    )
    .with_url(BOARD_URL)
}
