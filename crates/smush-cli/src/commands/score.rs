use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use smush_core::consts::DEFAULT_PROXY_FILTER;
use smush_core::pipeline::config::SmushConfig;
use smush_core::pipeline::score_input;

use crate::progress::BarReporter;

#[derive(Args)]
pub struct ScoreArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Filter for the low-resolution scoring pass
    #[arg(long, default_value = DEFAULT_PROXY_FILTER)]
    pub proxy_filter: String,

    /// Score cache file (TOML)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Show the N most active frame pairs
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Write every pair score to this file, one per line
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &ScoreArgs) -> Result<()> {
    let mut config = SmushConfig::new(args.file.clone(), PathBuf::new());
    config.scoring.proxy_filter = args.proxy_filter.clone();
    config.scoring.cache = args.cache.clone();

    let reporter = BarReporter::new();
    let scores = score_input(&config, &reporter)
        .with_context(|| format!("Failed to score {}", args.file.display()))?;

    println!("\nFrames:      {}", scores.frame_count());
    println!("Mean score:  {:.4}", scores.mean());
    println!("Max score:   {:.4}", scores.max());

    let mut ranked: Vec<(usize, f64)> = scores.pairs().iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    if !ranked.is_empty() && args.top > 0 {
        println!("\n{:>5}  {:>12}  {:>10}", "Rank", "Frames", "Score");
        println!("{}", "-".repeat(32));
        for (rank, (idx, score)) in ranked.iter().take(args.top).enumerate() {
            let pair = format!("{}-{}", idx, idx + 1);
            println!("{:>5}  {:>12}  {:>10.4}", rank + 1, pair, score);
        }
    }

    if let Some(ref path) = args.output {
        let mut out = String::new();
        for score in scores.pairs() {
            let _ = writeln!(out, "{score}");
        }
        std::fs::write(path, out)
            .with_context(|| format!("Failed to write scores to {}", path.display()))?;
        println!("\nScores saved to {}", path.display());
    }

    Ok(())
}
