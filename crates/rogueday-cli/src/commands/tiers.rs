use serde::Serialize;

use rogueday_core::{TierProgress, TierSpec};

use super::{open_manager, print_json, CliResult};

#[derive(Serialize)]
struct TierView<'a> {
    #[serde(flatten)]
    spec: &'a TierSpec,
    progress: &'a TierProgress,
}

pub fn run() -> CliResult {
    let manager = open_manager()?;
    let progress = manager.tier_progress()?;
    let view: Vec<TierView<'_>> = manager
        .catalog()
        .iter()
        .zip(&progress)
        .map(|(spec, progress)| TierView { spec, progress })
        .collect();
    print_json(&view)
}
