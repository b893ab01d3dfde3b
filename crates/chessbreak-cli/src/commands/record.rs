use chessbreak_core::page::markers;
use chessbreak_core::{Database, OptionsFile, PageNode, Signal, TiltMachine};
use chrono::Utc;
use clap::{Args, ValueEnum};
use serde_json::json;

#[derive(Clone, Copy, ValueEnum)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Result title the way the site phrases it.
    fn title(self) -> &'static str {
        match self {
            Outcome::Win => "You Won!",
            Outcome::Loss => "Black Won",
            Outcome::Draw => "Draw",
        }
    }
}

#[derive(Args)]
pub struct RecordArgs {
    /// Viewer's handle
    #[arg(long)]
    pub viewer: String,
    /// Opponent's handle
    #[arg(long, default_value = "opponent")]
    pub opponent: String,
    /// How the game ended for the viewer
    #[arg(long, value_enum)]
    pub result: Outcome,
    /// Reason line shown under the result (e.g. "by resignation")
    #[arg(long, default_value = "")]
    pub reason: String,
    /// Viewer's rating shown on the board when the game started
    #[arg(long)]
    pub rating: Option<i32>,
    /// Signed rating change shown in the result panel
    #[arg(long, allow_hyphen_values = true)]
    pub rating_change: Option<i32>,
}

pub fn run(args: RecordArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut page = super::board(&args.viewer, &args.opponent, args.rating);
    let mut machine = TiltMachine::start(
        &mut page,
        OptionsFile::default_location()?,
        Database::open()?,
        Utc::now(),
    )?;

    let mut signals: Vec<Signal> = Vec::new();
    let batch = page.append(PageNode::with_class("resign-button-component"));
    signals.extend(machine.on_mutations(&batch, &mut page, Utc::now()));
    let batch = page.remove("resign-button-component");
    signals.extend(machine.on_mutations(&batch, &mut page, Utc::now()));

    let mut panel = PageNode::with_class(markers::RESULT_PANEL)
        .child(PageNode::with_class(markers::RESULT_TITLE).text(args.result.title()))
        .child(PageNode::with_class(markers::RESULT_SUBTITLE).text(&args.reason));
    if let Some(change) = args.rating_change {
        panel = panel.child(PageNode::with_class("rating-delta").text(&format!("{change:+}")));
    }
    let batch = page.append(panel);
    signals.extend(machine.on_mutations(&batch, &mut page, Utc::now()));
    tracing::debug!(count = signals.len(), "Game replayed");

    let counters = machine.counters();
    let output = json!({
        "stats": counters.stats(),
        "streak": counters.streak,
        "lockedOut": machine.lockout().active,
        "signals": signals,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
