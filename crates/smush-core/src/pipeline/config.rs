use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::accumulate::AccumulatorKind;
use crate::consts::{
    DEFAULT_EXPONENT_SWEEP, DEFAULT_INPUT_QUEUE, DEFAULT_OUTPUT_FPS, DEFAULT_OUTPUT_QUEUE,
    DEFAULT_OUTPUT_SECONDS, DEFAULT_PLAN_CHUNK_SIZE, DEFAULT_PROXY_FILTER, DEFAULT_SINGLE_SOURCE_FRAMES,
    DEFAULT_SOURCE_FPS,
};
use crate::smooth::{SavitzkyGolay, VariabilityConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmushConfig {
    pub input: PathBuf,
    /// `.ser` file or a directory for numbered PNGs.
    pub output: PathBuf,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub smoothing: SavitzkyGolay,
    #[serde(default)]
    pub variability: VariabilityConfig,
    #[serde(default)]
    pub accumulator: AccumulatorKind,
    #[serde(default)]
    pub buffering: BufferingConfig,
}

impl SmushConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            source: SourceConfig::default(),
            scoring: ScoringConfig::default(),
            schedule: ScheduleConfig::default(),
            smoothing: SavitzkyGolay::default(),
            variability: VariabilityConfig::default(),
            accumulator: AccumulatorKind::default(),
            buffering: BufferingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Filter applied to full-resolution frames before merging.
    pub filter: Option<String>,
    /// Frame rate used when the input records none.
    pub default_fps: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_fps: DEFAULT_SOURCE_FPS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Filter producing the low-resolution proxy stream for pass 1.
    pub proxy_filter: String,
    /// TOML file to reuse scores across runs.
    pub cache: Option<PathBuf>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            proxy_filter: DEFAULT_PROXY_FILTER.into(),
            cache: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Threshold-bucket over raw activity scores.
    Threshold,
    /// Smooth, search an exponent, threshold-bucket the enhanced series.
    #[default]
    Enhanced,
    /// Smooth and enhance, then read merge counts straight off the timeline.
    Direct,
    /// Per-span speedups from a keyframe script.
    Keyframes,
    /// Precomputed cumulative ratio table.
    RatioTable,
    /// Same merge count everywhere.
    Flat,
}

impl ScheduleMode {
    /// Whether this mode needs the activity scoring pass.
    pub fn needs_scores(&self) -> bool {
        matches!(self, Self::Threshold | Self::Enhanced | Self::Direct)
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold => write!(f, "Threshold"),
            Self::Enhanced => write!(f, "Enhanced"),
            Self::Direct => write!(f, "Direct"),
            Self::Keyframes => write!(f, "Keyframes"),
            Self::RatioTable => write!(f, "Ratio table"),
            Self::Flat => write!(f, "Flat"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub mode: ScheduleMode,
    pub output_fps: f64,
    /// Target output length for the score-driven and flat modes.
    pub output_seconds: f64,
    /// Keyframe script, required by `keyframes` mode.
    pub keyframes: Option<PathBuf>,
    /// Ratio table, required by `ratio_table` mode.
    pub ratio_table: Option<PathBuf>,
    /// Exponents `enhanced` mode falls back to, ascending, when the
    /// configured variability exponent gives too long a schedule.
    pub exponent_sweep: Vec<f64>,
    /// Sets the `enhanced` bucket threshold: about this many output frames,
    /// scaled by the source-to-target ratio, keep a single source frame.
    pub single_source_frames: usize,
    /// Input frames per chunk when writing ratio plans.
    pub chunk_size: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            output_fps: DEFAULT_OUTPUT_FPS,
            output_seconds: DEFAULT_OUTPUT_SECONDS,
            keyframes: None,
            ratio_table: None,
            exponent_sweep: DEFAULT_EXPONENT_SWEEP.to_vec(),
            single_source_frames: DEFAULT_SINGLE_SOURCE_FRAMES,
            chunk_size: DEFAULT_PLAN_CHUNK_SIZE,
        }
    }
}

impl ScheduleConfig {
    /// Output frame count the score-driven modes aim for.
    pub fn target_output_frames(&self) -> usize {
        ((self.output_seconds * self.output_fps).round() as usize).max(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferingConfig {
    /// Decoded frames queued between the source and the merge loop.
    pub input_queue: usize,
    /// Averaged frames queued between the merge loop and the sink.
    pub output_queue: usize,
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            input_queue: DEFAULT_INPUT_QUEUE,
            output_queue: DEFAULT_OUTPUT_QUEUE,
        }
    }
}
