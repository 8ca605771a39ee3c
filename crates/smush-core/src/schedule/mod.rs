//! Merge schedules: how many consecutive source frames fold into each output frame.

mod keyframe;
mod ratio;
pub mod script;

use tracing::{debug, warn};

use crate::error::{Result, SmushError};
use crate::smooth::VariabilityConfig;

pub use keyframe::{keyframe_schedule, Keyframe};
pub use ratio::{cumulative_plan, ratio_table_schedule};

/// Ordered, non-empty list of positive merge counts.
///
/// `len()` is the number of output frames, `total_frames()` the number of
/// source frames consumed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeSchedule {
    entries: Vec<u32>,
}

impl MergeSchedule {
    pub fn new(entries: Vec<u32>) -> Result<Self> {
        if entries.is_empty() {
            return Err(SmushError::EmptySchedule);
        }
        if let Some(pos) = entries.iter().position(|&e| e == 0) {
            return Err(SmushError::InvalidInput(format!(
                "schedule entry {pos} is zero; every output frame needs at least one source frame"
            )));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: construction rejects empty schedules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_frames(&self) -> u64 {
        self.entries.iter().map(|&e| e as u64).sum()
    }

    pub fn min_merge(&self) -> u32 {
        self.entries.iter().copied().min().unwrap_or(1)
    }

    pub fn max_merge(&self) -> u32 {
        self.entries.iter().copied().max().unwrap_or(1)
    }

    /// Playback length of the output at `output_fps`.
    pub fn output_seconds(&self, output_fps: f64) -> f64 {
        self.len() as f64 / output_fps
    }
}

/// Threshold-bucket scheduling over one score per source frame.
///
/// Each output frame receives roughly the same amount of visual change:
/// frames accumulate until their summed score reaches `sum / target`.
/// Leftover frames at the end form a final, possibly short, group, so the
/// schedule always consumes exactly `frame_scores.len()` frames.
pub fn threshold_bucket(frame_scores: &[f64], target_output_frames: usize) -> Result<MergeSchedule> {
    if frame_scores.is_empty() {
        return Err(SmushError::EmptySequence);
    }
    if target_output_frames == 0 {
        return Err(SmushError::InvalidInput(
            "target output frame count must be at least 1".into(),
        ));
    }
    if frame_scores.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(SmushError::InvalidInput(
            "activity scores must be finite and non-negative".into(),
        ));
    }

    let threshold = frame_scores.iter().sum::<f64>() / target_output_frames as f64;
    if threshold <= 0.0 || !threshold.is_finite() {
        warn!(
            frames = frame_scores.len(),
            target = target_output_frames,
            "No measurable activity, using a flat schedule"
        );
        return flat_schedule(frame_scores.len(), target_output_frames);
    }

    let groups = bucket(frame_scores, threshold);
    debug!(threshold, outputs = groups.len(), "Threshold-bucket schedule");
    MergeSchedule::new(groups)
}

/// Close a group whenever the running score reaches `threshold`. Pending
/// frames at the end form a final group.
fn bucket(scores: &[f64], threshold: f64) -> Vec<u32> {
    let mut groups = Vec::new();
    let mut pending = 0u32;
    let mut running = 0.0f64;
    for &score in scores {
        running += score;
        pending += 1;
        if running >= threshold {
            groups.push(pending);
            pending = 0;
            running = 0.0;
        }
    }
    if pending > 0 {
        groups.push(pending);
    }
    groups
}

/// Use precomputed per-chunk merge counts as the schedule, one entry each.
pub fn direct_readout(merge_counts: &[u32]) -> Result<MergeSchedule> {
    MergeSchedule::new(merge_counts.to_vec())
}

/// Flip enhanced activity levels into merge counts: the busiest stretch gets
/// `min_merge`, the quietest `max_merge`.
pub fn merge_counts_from_levels(levels: &[u32], config: &VariabilityConfig) -> Vec<u32> {
    levels
        .iter()
        .map(|&l| {
            let l = l.clamp(config.min_merge, config.max_merge);
            config.max_merge - (l - config.min_merge)
        })
        .collect()
}

/// Uniform schedule from the plain source-to-output ratio. The last group is
/// clipped so exactly `total_frames` are consumed.
pub fn flat_schedule(total_frames: usize, target_output_frames: usize) -> Result<MergeSchedule> {
    if total_frames == 0 {
        return Err(SmushError::EmptySequence);
    }
    let target = target_output_frames.max(1);
    let ratio = ((total_frames as f64 / target as f64).round() as usize).max(1);
    let mut entries = Vec::with_capacity(total_frames / ratio + 1);
    let mut remaining = total_frames;
    while remaining > 0 {
        let step = remaining.min(ratio);
        entries.push(step as u32);
        remaining -= step;
    }
    MergeSchedule::new(entries)
}

/// Outcome of [`search_exponent`].
#[derive(Clone, Debug)]
pub struct ExponentSearch {
    pub schedule: MergeSchedule,
    /// Exponent that produced the schedule, `None` when the flat fallback was used.
    pub exponent: Option<f64>,
}

/// Reshape the smoothed series with a power curve until the schedule fits.
///
/// Scores are scaled to a mean of 1.0 so raising them to an exponent
/// stretches busy frames and flattens quiet ones. The bucket threshold is the
/// shaped score ranked `single_source_frames * (len / target)` from the top,
/// so roughly that many frames stay unmerged while a larger exponent folds
/// more of the quiet frames together. The configured exponent is tried first,
/// then every larger entry of `sweep`. The first schedule no longer than the
/// target wins; if none fits, fall back to [`flat_schedule`].
pub fn search_exponent(
    smoothed: &[f64],
    target_output_frames: usize,
    single_source_frames: usize,
    sweep: &[f64],
    base: &VariabilityConfig,
) -> Result<ExponentSearch> {
    base.validate()?;
    if smoothed.is_empty() {
        return Err(SmushError::EmptySequence);
    }
    if target_output_frames == 0 {
        return Err(SmushError::InvalidInput(
            "target output frame count must be at least 1".into(),
        ));
    }
    if smoothed.iter().any(|v| !v.is_finite()) {
        return Err(SmushError::InvalidInput(
            "activity series contains non-finite values".into(),
        ));
    }
    if let Some(bad) = sweep.iter().find(|e| !e.is_finite() || **e <= 0.0) {
        return Err(SmushError::InvalidInput(format!(
            "sweep exponents must be positive, got {bad}"
        )));
    }

    // Smoothing can overshoot below zero on steep drops.
    let clipped: Vec<f64> = smoothed.iter().map(|v| v.max(0.0)).collect();
    let mean = clipped.iter().sum::<f64>() / clipped.len() as f64;
    if mean > 0.0 {
        let scaled: Vec<f64> = clipped.iter().map(|v| v / mean).collect();
        let ratio = (scaled.len() / target_output_frames).max(1);
        let rank = single_source_frames
            .saturating_mul(ratio)
            .min(scaled.len() - 1);

        let candidates = std::iter::once(base.exponent)
            .chain(sweep.iter().copied().filter(|&e| e > base.exponent));
        for exponent in candidates {
            let shaped: Vec<f64> = scaled.iter().map(|v| v.powf(exponent)).collect();
            let mut ranked = shaped.clone();
            ranked.sort_unstable_by(|a, b| b.total_cmp(a));
            let threshold = ranked[rank];
            if threshold <= 0.0 {
                continue;
            }

            let groups = bucket(&shaped, threshold);
            debug!(exponent, threshold, outputs = groups.len(), "Exponent candidate");
            if groups.len() <= target_output_frames {
                return Ok(ExponentSearch {
                    schedule: MergeSchedule::new(groups)?,
                    exponent: Some(exponent),
                });
            }
        }
    }

    warn!(
        target = target_output_frames,
        "No exponent met the target length, using a flat schedule"
    );
    Ok(ExponentSearch {
        schedule: flat_schedule(smoothed.len(), target_output_frames)?,
        exponent: None,
    })
}
