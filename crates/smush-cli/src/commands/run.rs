use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use smush_core::accumulate::AccumulatorKind;
use smush_core::consts::{
    DEFAULT_OUTPUT_FPS, DEFAULT_OUTPUT_SECONDS, DEFAULT_PROXY_FILTER, DEFAULT_SINGLE_SOURCE_FRAMES,
    DEFAULT_SOURCE_FPS,
};
use smush_core::pipeline::config::{ScheduleMode, SmushConfig};
use smush_core::pipeline::run_merge_reported;

use crate::progress::BarReporter;
use crate::summary::{print_plan_summary, print_run_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum ScheduleModeArg {
    Threshold,
    Enhanced,
    Direct,
    Keyframes,
    RatioTable,
    Flat,
}

impl From<ScheduleModeArg> for ScheduleMode {
    fn from(arg: ScheduleModeArg) -> Self {
        match arg {
            ScheduleModeArg::Threshold => Self::Threshold,
            ScheduleModeArg::Enhanced => Self::Enhanced,
            ScheduleModeArg::Direct => Self::Direct,
            ScheduleModeArg::Keyframes => Self::Keyframes,
            ScheduleModeArg::RatioTable => Self::RatioTable,
            ScheduleModeArg::Flat => Self::Flat,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AccumulatorArg {
    Cpu,
    Gpu,
    Array,
}

impl From<AccumulatorArg> for AccumulatorKind {
    fn from(arg: AccumulatorArg) -> Self {
        match arg {
            AccumulatorArg::Cpu => Self::Cpu,
            AccumulatorArg::Gpu => Self::Gpu,
            AccumulatorArg::Array => Self::Array,
        }
    }
}

/// Options shared by `plan` and `run`.
#[derive(Args)]
pub struct ScheduleArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Schedule mode
    #[arg(long, value_enum, default_value = "enhanced")]
    pub mode: ScheduleModeArg,

    /// Output frame rate
    #[arg(long, default_value_t = DEFAULT_OUTPUT_FPS)]
    pub fps: f64,

    /// Target output length in seconds (score-driven and flat modes)
    #[arg(long, default_value_t = DEFAULT_OUTPUT_SECONDS)]
    pub seconds: f64,

    /// Keyframe script (`<[[h:]m:]s> <seconds>` per line)
    #[arg(long)]
    pub keyframes: Option<PathBuf>,

    /// Two-column ratio table (input frame, cumulative output frame)
    #[arg(long)]
    pub ratio_table: Option<PathBuf>,

    /// Frame rate to assume when the SER file has no timestamps
    #[arg(long, default_value_t = DEFAULT_SOURCE_FPS)]
    pub source_fps: f64,

    /// Filter for the low-resolution scoring pass
    #[arg(long, default_value = DEFAULT_PROXY_FILTER)]
    pub proxy_filter: String,

    /// Filter for the full-resolution merge pass
    #[arg(long)]
    pub filter: Option<String>,

    /// Score cache file (TOML)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Power-curve exponent (enhanced mode tries it first, direct mode uses it as is)
    #[arg(long)]
    pub exponent: Option<f64>,

    /// Output frames per source-to-target ratio kept unmerged in enhanced mode
    #[arg(long, default_value_t = DEFAULT_SINGLE_SOURCE_FRAMES)]
    pub single_source_frames: usize,

    /// Largest number of frames merged into one
    #[arg(long)]
    pub max_merge: Option<u32>,
}

impl ScheduleArgs {
    pub fn to_config(&self, output: PathBuf) -> SmushConfig {
        let mut config = SmushConfig::new(self.file.clone(), output);
        config.source.default_fps = self.source_fps;
        config.source.filter = self.filter.clone();
        config.scoring.proxy_filter = self.proxy_filter.clone();
        config.scoring.cache = self.cache.clone();
        config.schedule.mode = self.mode.into();
        config.schedule.output_fps = self.fps;
        config.schedule.output_seconds = self.seconds;
        config.schedule.keyframes = self.keyframes.clone();
        config.schedule.ratio_table = self.ratio_table.clone();
        config.schedule.single_source_frames = self.single_source_frames;
        if let Some(exponent) = self.exponent {
            config.variability.exponent = exponent;
        }
        if let Some(max_merge) = self.max_merge {
            config.variability.max_merge = max_merge;
        }
        config
    }
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Config file (TOML); its settings replace the options above
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Accumulator backend
    #[arg(long, value_enum, default_value = "cpu")]
    pub accumulator: AccumulatorArg,

    /// Output `.ser` file, or a directory for numbered PNGs
    #[arg(short, long, default_value = "timelapse.ser")]
    pub output: PathBuf,
}

pub fn load_config(path: &PathBuf) -> Result<SmushConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).context("Invalid smush config")
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = match args.config {
        Some(ref path) => {
            let mut config = load_config(path)?;
            config.input = args.schedule.file.clone();
            config
        }
        None => {
            let mut config = args.schedule.to_config(args.output.clone());
            config.accumulator = args.accumulator.into();
            config
        }
    };

    let reporter = BarReporter::new();
    let summary = run_merge_reported(&config, &reporter)
        .with_context(|| format!("Failed to merge {}", config.input.display()))?;

    print_plan_summary(&config, &summary.plan);
    print_run_summary(&config, &summary.report);
    Ok(())
}
