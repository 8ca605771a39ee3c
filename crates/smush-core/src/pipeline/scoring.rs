//! Pass 1: fingerprint a proxy stream and score consecutive frames.

use std::sync::mpsc::sync_channel;
use std::thread;

use tracing::info;

use crate::activity::{fingerprint, score_fingerprints, ActivityScores};
use crate::error::Result;
use crate::io::FrameSource;

use super::types::{PipelineStage, ProgressReporter};

/// Score every consecutive frame pair of `source`.
///
/// Fingerprints are computed on a producer thread and handed over through a
/// bounded queue of `queue` entries; the scorer holds at most two at a time.
pub fn score_source(
    source: Box<dyn FrameSource>,
    queue: usize,
    reporter: &dyn ProgressReporter,
) -> Result<ActivityScores> {
    reporter.begin_stage(PipelineStage::Scoring, source.frame_count_hint());
    let frames = source.into_frames();
    let (tx, rx) = sync_channel(queue.max(1));

    let scores = thread::scope(|s| {
        s.spawn(move || {
            for frame in frames {
                let item = frame.map(|image| fingerprint(&image));
                let failed = item.is_err();
                if tx.send(item).is_err() || failed {
                    break;
                }
            }
        });

        let mut seen = 0usize;
        let result = score_fingerprints(rx.iter().inspect(|_| {
            seen += 1;
            reporter.advance(seen);
        }));
        drop(rx);
        result
    })?;
    reporter.finish_stage();

    info!(
        frames = scores.frame_count(),
        mean = scores.mean(),
        max = scores.max(),
        "Activity scored"
    );
    Ok(scores)
}
