mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smush", about = "Adaptive timelapse: merge quiet stretches, keep the action")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show SER file metadata
    Info(commands::info::InfoArgs),
    /// Score visual activity between consecutive frames
    Score(commands::score::ScoreArgs),
    /// Compute a merge schedule without merging
    Plan(commands::plan::PlanArgs),
    /// Plan and merge into a timelapse
    Run(commands::run::RunArgs),
    /// Print a default config file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Score(args) => commands::score::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
