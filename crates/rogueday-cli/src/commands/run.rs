//! Run lifecycle commands.

use clap::Subcommand;

use super::{open_manager, print_json, CliResult};

#[derive(Subcommand)]
pub enum RunAction {
    /// Start today's run (a stale run from an earlier day is abandoned first)
    Start,
    /// Show the active run
    Status,
    /// Extract the active run and bank its XP
    Extract,
    /// Abandon the active run without credit
    Abandon,
    /// Abandon the active run if it belongs to an earlier day
    Rollover,
}

pub fn run(action: RunAction) -> CliResult {
    let mut manager = open_manager()?;

    match action {
        RunAction::Start => {
            if let Some(stale) = manager.abandon_stale_run()? {
                tracing::warn!(run_id = %stale.id, run_date = %stale.run_date, "abandoned stale run");
            }
            let run = manager.start_new_run()?;
            print_json(&run)?;
        }
        RunAction::Status => match manager.current_run()? {
            Some(run) => print_json(&run)?,
            None => return Err("no active run".into()),
        },
        RunAction::Extract => {
            let extraction = manager.extract()?;
            print_json(&extraction)?;
        }
        RunAction::Abandon => {
            let run = manager.abandon()?;
            print_json(&run)?;
        }
        RunAction::Rollover => {
            let abandoned = manager.abandon_stale_run()?;
            print_json(&serde_json::json!({ "abandoned": abandoned }))?;
        }
    }
    Ok(())
}
