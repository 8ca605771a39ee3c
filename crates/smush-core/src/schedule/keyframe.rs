use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SmushError};

use super::MergeSchedule;

/// A source timestamp and how long its span should last in the output.
///
/// The span runs until the next keyframe; the last keyframe only marks the end.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub at: Duration,
    pub output: Duration,
}

impl Keyframe {
    pub fn new(at: Duration, output: Duration) -> Self {
        Self { at, output }
    }

    pub fn from_secs(at: f64, output: f64) -> Self {
        Self {
            at: Duration::from_secs_f64(at),
            output: Duration::from_secs_f64(output),
        }
    }
}

/// Constant speedup per keyframe span.
///
/// Each span merges `round(source frames / output frames)` frames per output
/// frame until the absolute boundary `floor(next.at * source_fps)`, clipping
/// the last group. Frames before the first keyframe join the first span.
/// The whole script is validated before anything is produced.
pub fn keyframe_schedule(
    keyframes: &[Keyframe],
    source_fps: f64,
    output_fps: f64,
) -> Result<MergeSchedule> {
    for (name, fps) in [("source", source_fps), ("output", output_fps)] {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SmushError::InvalidInput(format!(
                "{name} frame rate must be positive, got {fps}"
            )));
        }
    }
    if keyframes.len() < 2 {
        return Err(SmushError::InvalidInput(
            "keyframe schedule needs at least two keyframes".into(),
        ));
    }

    for pair in keyframes.windows(2) {
        if pair[1].at <= pair[0].at {
            return Err(SmushError::ScheduleOrder {
                previous: format!("{:.3}s", pair[0].at.as_secs_f64()),
                next: format!("{:.3}s", pair[1].at.as_secs_f64()),
            });
        }
    }

    let steps: Vec<u64> = keyframes
        .windows(2)
        .enumerate()
        .map(|(span, pair)| span_step(span, &pair[0], &pair[1], source_fps, output_fps))
        .collect::<Result<_>>()?;

    let mut entries = Vec::new();
    let mut current = 0u64;
    for (pair, step) in keyframes.windows(2).zip(steps) {
        let end = (pair[1].at.as_secs_f64() * source_fps).floor() as u64;
        while current < end {
            let take = (end - current).min(step).min(u32::MAX as u64);
            entries.push(take as u32);
            current += take;
        }
    }

    debug!(
        keyframes = keyframes.len(),
        outputs = entries.len(),
        frames = current,
        "Keyframe schedule"
    );
    MergeSchedule::new(entries)
}

/// Integer merge count for one span, or `ScheduleRate` if it would need slow motion.
fn span_step(
    span: usize,
    from: &Keyframe,
    to: &Keyframe,
    source_fps: f64,
    output_fps: f64,
) -> Result<u64> {
    let source_frames = (to.at - from.at).as_secs_f64() * source_fps;
    let target_frames = from.output.as_secs_f64() * output_fps;
    if target_frames <= 0.0 {
        return Ok(u64::MAX);
    }
    let speedup = source_frames / target_frames;
    if speedup < 1.0 {
        return Err(SmushError::ScheduleRate { span, speedup });
    }
    Ok((speedup.round() as u64).max(1))
}
