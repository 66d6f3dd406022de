pub mod config;
pub mod preset;
pub mod run;
pub mod stats;
pub mod task;
pub mod template;
pub mod tiers;

use rogueday_core::{Config, RunManager, SqliteStore, TierLevel};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Manager over the on-disk database, configured from `config.toml`.
pub fn open_manager() -> Result<RunManager<SqliteStore>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    Ok(RunManager::from_config(store, &config)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Clap value parser for `--tier`.
pub fn parse_tier(s: &str) -> Result<TierLevel, String> {
    let n: u8 = s.parse().map_err(|_| format!("invalid tier: {s}"))?;
    TierLevel::try_from(n).map_err(|e| e.to_string())
}
