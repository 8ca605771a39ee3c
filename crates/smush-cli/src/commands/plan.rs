use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use smush_core::consts::DEFAULT_PLAN_CHUNK_SIZE;
use smush_core::pipeline::{plan_schedule, ratio_plan, score_input};
use smush_core::schedule::script::format_ratio_table;

use super::run::ScheduleArgs;
use crate::progress::BarReporter;
use crate::summary::print_plan_summary;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Write a cumulative ratio table built from chunked activity
    #[arg(long)]
    pub ratio_out: Option<PathBuf>,

    /// Input frames per chunk for --ratio-out
    #[arg(long, default_value_t = DEFAULT_PLAN_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Print the first N schedule entries
    #[arg(long, default_value = "0")]
    pub show: usize,
}

pub fn run(args: &PlanArgs) -> Result<()> {
    let mut config = args.schedule.to_config(PathBuf::new());
    config.schedule.chunk_size = args.chunk_size;
    let reporter = BarReporter::new();

    let plan = plan_schedule(&config, &reporter).context("Failed to plan schedule")?;
    print_plan_summary(&config, &plan);

    if args.show > 0 {
        println!("{:>8}  {:>8}", "Output", "Merge");
        println!("{}", "-".repeat(18));
        for (i, merge) in plan.schedule.entries().iter().take(args.show).enumerate() {
            println!("{i:>8}  {merge:>8}");
        }
    }

    if let Some(ref path) = args.ratio_out {
        let scores = score_input(&config, &reporter)?;
        let rows = ratio_plan(&scores, &config)?;
        std::fs::write(path, format_ratio_table(&rows))
            .with_context(|| format!("Failed to write ratio table {}", path.display()))?;
        println!("Ratio table ({} rows) saved to {}", rows.len(), path.display());
    }

    Ok(())
}
