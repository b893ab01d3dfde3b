use chessbreak_core::{ControlMessage, Database, OptionsFile, TiltMachine};
use chrono::Utc;
use clap::Args;

#[derive(Args)]
pub struct ClearArgs {
    /// Handle to sign in as while clearing
    #[arg(long, default_value = "local")]
    pub viewer: String,
}

pub fn run(args: ClearArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut page = super::board(&args.viewer, "opponent", None);
    let now = Utc::now();
    let mut machine = TiltMachine::start(
        &mut page,
        OptionsFile::default_location()?,
        Database::open()?,
        now,
    )?;

    let signals = machine.on_control(ControlMessage::ClearStats, &mut page, now);
    for signal in &signals {
        println!("{}", serde_json::to_string(signal)?);
    }
    println!("session stats cleared");
    Ok(())
}
