//! Task commands for the active run.

use clap::Subcommand;
use rogueday_core::{TaskDraft, TierLevel};

use super::{open_manager, parse_tier, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the active run
    Add {
        /// Task title
        title: String,
        /// Tier (1, 2 or 3)
        #[arg(long, value_parser = parse_tier)]
        tier: TierLevel,
        /// Planned duration in minutes
        #[arg(long)]
        duration: u32,
        /// Run the task with a focus timer
        #[arg(long)]
        timer: bool,
    },
    /// Start a pending task
    Start {
        /// Task ID
        id: String,
    },
    /// Complete a task
    Complete {
        /// Task ID
        id: String,
    },
    /// Fail a task
    Fail {
        /// Task ID
        id: String,
    },
    /// Delete a pending task and refund its energy
    Delete {
        /// Task ID
        id: String,
    },
    /// Show the XP a task would earn
    Preview {
        /// Tier (1, 2 or 3)
        #[arg(long, value_parser = parse_tier)]
        tier: TierLevel,
        /// Planned duration in minutes
        #[arg(long)]
        duration: u32,
        /// Run the task with a focus timer
        #[arg(long)]
        timer: bool,
    },
}

pub fn run(action: TaskAction) -> CliResult {
    let mut manager = open_manager()?;

    match action {
        TaskAction::Add {
            title,
            tier,
            duration,
            timer,
        } => {
            let task = manager.add_task(&TaskDraft::new(title, tier, duration, timer))?;
            print_json(&task)?;
        }
        TaskAction::Start { id } => print_json(&manager.start_task(&id)?)?,
        TaskAction::Complete { id } => print_json(&manager.complete_task(&id)?)?,
        TaskAction::Fail { id } => {
            let outcome = manager.fail_task(&id)?;
            print_json(&serde_json::json!({
                "task": outcome.task,
                "penalty_xp": outcome.penalty_xp,
            }))?;
        }
        TaskAction::Delete { id } => {
            let task = manager.delete_task(&id)?;
            println!("Task deleted: {}", task.id);
        }
        TaskAction::Preview {
            tier,
            duration,
            timer,
        } => {
            let xp = manager.preview_xp(tier, duration, timer)?;
            print_json(&serde_json::json!({ "tier": tier, "duration": duration, "xp": xp }))?;
        }
    }
    Ok(())
}
