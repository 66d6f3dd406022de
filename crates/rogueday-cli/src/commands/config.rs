use clap::Subcommand;
use rogueday_core::{Config, ConfigError};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dot path
    Get {
        /// e.g. "user_id", "economy.max_energy", "penalty.fail_penalty_percent",
        /// "tiers.t3.unlock_requirement_minutes"
        key: String,
    },
    /// Change one value; the whole config is re-validated before saving
    Set {
        /// Dot path of the value to change
        key: String,
        /// New value, parsed as JSON when possible (e.g. 20, true, [1,3])
        value: String,
    },
    /// Print the whole config as JSON
    List,
    /// Print where the config file lives
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            tracing::debug!(key = %key, value = ?config.get(&key), "config updated");
            println!("ok");
        }
        ConfigAction::List => print_json(&Config::load()?)?,
        ConfigAction::Path => println!("{}", Config::path()?.display()),
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
