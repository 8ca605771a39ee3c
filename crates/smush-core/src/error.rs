use thiserror::Error;

use crate::pipeline::MergeReport;

#[derive(Error, Debug)]
pub enum SmushError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Accumulator overflow: {frames_added} frames already summed (limit {limit}), flush sooner or lower max merge")]
    Overflow { frames_added: u32, limit: u32 },

    #[error("Keyframes must be strictly increasing: {previous} then {next}")]
    ScheduleOrder { previous: String, next: String },

    #[error("Span {span} needs a speedup of {speedup:.3}, slow motion is not supported")]
    ScheduleRate { span: usize, speedup: f64 },

    #[error("Unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    #[error("Empty merge schedule")]
    EmptySchedule,

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Score cache error: {0}")]
    Cache(String),

    #[error("GPU error: {0}")]
    GpuError(String),

    #[error("Merge aborted after {} output frames ({} source frames read): {source}", .report.frames_emitted, .report.frames_read)]
    PipelineAborted {
        report: MergeReport,
        source: Box<SmushError>,
    },
}

pub type Result<T> = std::result::Result<T, SmushError>;
