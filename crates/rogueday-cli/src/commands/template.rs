//! Task template commands.

use clap::Subcommand;
use rogueday_core::{TaskDraft, TierLevel};

use super::{open_manager, parse_tier, print_json, CliResult};

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create a template
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
        /// Free-form category
        #[arg(long)]
        category: Option<String>,
    },
    /// Create a template from an existing task
    FromTask {
        /// Task ID
        task_id: String,
        /// Free-form category
        #[arg(long)]
        category: Option<String>,
    },
    /// List templates, most used first
    List {
        /// Only templates in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a template (presets drop it)
    Delete {
        /// Template ID
        id: String,
    },
}

pub fn run(action: TemplateAction) -> CliResult {
    let mut manager = open_manager()?;

    match action {
        TemplateAction::Add {
            title,
            tier,
            duration,
            timer,
            category,
        } => {
            let template =
                manager.create_template(TaskDraft::new(title, tier, duration, timer), category)?;
            print_json(&template)?;
        }
        TemplateAction::FromTask { task_id, category } => {
            let template = manager.template_from_task(&task_id, category)?;
            print_json(&template)?;
        }
        TemplateAction::List { category } => {
            let templates = manager.list_templates(category.as_deref())?;
            print_json(&templates)?;
        }
        TemplateAction::Delete { id } => {
            manager.delete_template(&id)?;
            println!("Template deleted: {id}");
        }
    }
    Ok(())
}
