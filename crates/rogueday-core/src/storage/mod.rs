mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;
mod store;

pub use config::{Config, EconomyConfig, TierOverride, TierOverrides};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::RunStore;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `ROGUEDAY_HOME` wins when set. Otherwise `~/.config/rogueday[-dev]/`,
/// with `ROGUEDAY_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("ROGUEDAY_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ROGUEDAY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("rogueday-dev")
            } else {
                base_dir.join("rogueday")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
