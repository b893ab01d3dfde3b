use chessbreak_core::{Options, OptionsFile};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum OptionsAction {
    /// Get an option value
    Get {
        /// Option key (e.g. "maxLosses", "timeoutDuration")
        key: String,
    },
    /// Set an option value
    Set {
        /// Option key
        key: String,
        /// New value
        value: String,
    },
    /// List all options
    List,
    /// Reset options to defaults
    Reset,
    /// Print the options file location
    Path,
}

pub fn run(action: OptionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let file = OptionsFile::default_location()?;

    match action {
        OptionsAction::Get { key } => match file.get(&key)? {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        OptionsAction::Set { key, value } => {
            file.set(&key, &value)?;
            println!("ok");
        }
        OptionsAction::List => {
            let options = file.load()?;
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        OptionsAction::Reset => {
            file.save(&Options::default())?;
            println!("options reset to defaults");
        }
        OptionsAction::Path => println!("{}", file.path().display()),
    }
    Ok(())
}
