use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "chessbreak-cli", version, about = "ChessBreak CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session and long-term statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Options management
    Options {
        #[command(subcommand)]
        action: commands::options::OptionsAction,
    },
    /// Record a finished game as if it had been seen on the page
    Record(commands::record::RecordArgs),
    /// Clear session stats and game history, ending any lockout
    Clear(commands::clear::ClearArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHESSBREAK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Options { action } => commands::options::run(action),
        Commands::Record(args) => commands::record::run(args),
        Commands::Clear(args) => commands::clear::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
