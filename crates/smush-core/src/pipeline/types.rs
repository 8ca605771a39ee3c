/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Scoring,
    Planning,
    Merging,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scoring => write!(f, "Scoring activity"),
            Self::Planning => write!(f, "Planning schedule"),
            Self::Merging => write!(f, "Merging frames"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items completed so far within the current stage.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Counters from one merge run, complete or aborted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Source frames received from the frame source.
    pub frames_read: u64,
    /// Averaged frames handed to the sink.
    pub frames_emitted: usize,
    /// Frames the sink confirmed on finish.
    pub frames_written: usize,
    /// Frames summed into a group that was never emitted (aborted runs only).
    pub frames_dropped: u32,
    /// Schedule entries that never produced an output frame.
    pub schedule_remaining: usize,
    /// Frames that arrived after the schedule ran out and went into the final group.
    pub unscheduled_frames: u64,
}
