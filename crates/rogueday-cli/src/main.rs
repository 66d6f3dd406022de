use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rogueday", version, about = "Rogue-Day run economy CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily run lifecycle
    Run {
        #[command(subcommand)]
        action: commands::run::RunAction,
    },
    /// Tasks in the active run
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Show the tier catalog and unlock progress
    Tiers,
    /// Reusable task templates
    Template {
        #[command(subcommand)]
        action: commands::template::TemplateAction,
    },
    /// Template presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Lifetime statistics and extraction journal
    Stats {
        /// Include past extractions, newest first
        #[arg(long)]
        journal: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROGUEDAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { action } => commands::run::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Tiers => commands::tiers::run(),
        Commands::Template { action } => commands::template::run(action),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Stats { journal } => commands::stats::run(journal),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
