use super::{open_manager, print_json, CliResult};

pub fn run(journal: bool) -> CliResult {
    let manager = open_manager()?;
    let user = manager.user()?;

    if journal {
        print_json(&serde_json::json!({
            "user": user,
            "journal": manager.journal()?,
        }))
    } else {
        print_json(&user)
    }
}
