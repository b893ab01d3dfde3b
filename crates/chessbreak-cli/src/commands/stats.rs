use chessbreak_core::{Database, Options, OptionsFile, PerformanceAnalyzer, SessionSnapshot};
use chrono::{Local, Utc};
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current session counters and lockout state
    Session,
    /// Long-term performance report
    Report,
    /// Recorded games, oldest first
    History,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let snapshot = SessionSnapshot::load(&db)?;

    match action {
        StatsAction::Session => {
            let options = OptionsFile::default_location()?.load().unwrap_or_else(|e| {
                tracing::warn!("Failed to load options, using defaults: {e}");
                Options::default()
            });
            let now = Utc::now().timestamp_millis();
            let remaining_ms = snapshot
                .timeout_start
                .map(|start| start + snapshot.timeout_ms as i64 - now)
                .filter(|&left| left > 0);
            let session = json!({
                "stats": snapshot.stats,
                "streak": snapshot.streak,
                "maxLosses": options.max_losses,
                "sessionStart": snapshot.session_start,
                "sessionLength": snapshot.session_length,
                "lockedOut": remaining_ms.is_some(),
                "lockoutRemainingMs": remaining_ms,
                "totalTiltCount": snapshot.total_tilt_count,
                "rating": snapshot.rating,
            });
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        StatsAction::Report => {
            let report = PerformanceAnalyzer::new().analyze(
                &snapshot.history,
                snapshot.total_tilt_count,
                &snapshot.rating,
                &Local::now(),
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::History => {
            println!("{}", serde_json::to_string_pretty(&snapshot.history)?);
        }
    }
    Ok(())
}
