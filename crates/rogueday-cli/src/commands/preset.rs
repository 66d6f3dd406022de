//! Preset commands.

use clap::Subcommand;
use rogueday_core::PresetUpdate;

use super::{open_manager, print_json, CliResult};

fn split_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// Create a preset from existing templates
    Create {
        /// Preset name
        name: String,
        /// Comma-separated template IDs, in application order
        #[arg(long, default_value = "")]
        templates: String,
        /// Display emoji
        #[arg(long)]
        emoji: Option<String>,
    },
    /// List presets, favorites first
    List,
    /// Update a preset
    Update {
        /// Preset ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New emoji (empty string clears it)
        #[arg(long)]
        emoji: Option<String>,
        /// Mark or unmark as favorite
        #[arg(long)]
        favorite: Option<bool>,
        /// Replace the template list (comma-separated IDs)
        #[arg(long)]
        templates: Option<String>,
    },
    /// Add every template of a preset to the active run
    Apply {
        /// Preset ID
        id: String,
    },
    /// Delete a preset (its templates are kept)
    Delete {
        /// Preset ID
        id: String,
    },
}

pub fn run(action: PresetAction) -> CliResult {
    let mut manager = open_manager()?;

    match action {
        PresetAction::Create {
            name,
            templates,
            emoji,
        } => {
            let preset = manager.create_preset(&name, emoji, split_ids(&templates))?;
            print_json(&preset)?;
        }
        PresetAction::List => print_json(&manager.list_presets()?)?,
        PresetAction::Update {
            id,
            name,
            emoji,
            favorite,
            templates,
        } => {
            let update = PresetUpdate {
                name,
                emoji,
                is_favorite: favorite,
                template_ids: templates.as_deref().map(split_ids),
            };
            print_json(&manager.update_preset(&id, update)?)?;
        }
        PresetAction::Apply { id } => {
            let report = manager.apply_preset(&id)?;
            eprintln!("{}", report.message);
            print_json(&report)?;
        }
        PresetAction::Delete { id } => {
            manager.delete_preset(&id)?;
            println!("Preset deleted: {id}");
        }
    }
    Ok(())
}
