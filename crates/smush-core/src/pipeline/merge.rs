//! Pass 2: stream full-resolution frames through one accumulator following a schedule.

use std::iter::Copied;
use std::slice::Iter;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::accumulate::{create_accumulator, AccumulatorKind, FrameAccumulator};
use crate::consts::{DEFAULT_INPUT_QUEUE, DEFAULT_OUTPUT_QUEUE, PROGRESS_LOG_INTERVAL};
use crate::error::{Result, SmushError};
use crate::frame::DecodedImage;
use crate::io::{FrameSink, FrameSource};
use crate::schedule::MergeSchedule;

use super::types::{MergeReport, PipelineStage, ProgressReporter};

/// Builds the accumulator once the first frame fixes the dimensions.
pub type AccumulatorFactory =
    Arc<dyn Fn(u32, u32) -> Result<Box<dyn FrameAccumulator>> + Send + Sync>;

/// Where the merge loop stands between two steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeState {
    /// The current group is empty.
    AwaitingFrame,
    /// Some frames of the current group have been added.
    Accumulating,
    /// The current group is complete and its average goes to the sink.
    Emitting,
    /// The source is exhausted and nothing is pending.
    Drained,
}

/// Merges consecutive source frames into averaged output frames.
///
/// Frames flow producer thread -> bounded queue -> merge loop -> bounded
/// queue -> sink thread. Full queues block the upstream stage. When the
/// schedule runs out before the source, the remaining frames form one final
/// group.
pub struct MergePipeline {
    schedule: MergeSchedule,
    factory: AccumulatorFactory,
    input_queue: usize,
    output_queue: usize,
}

impl MergePipeline {
    pub fn new(schedule: MergeSchedule, kind: AccumulatorKind) -> Self {
        Self {
            schedule,
            factory: Arc::new(move |w, h| create_accumulator(kind, w, h)),
            input_queue: DEFAULT_INPUT_QUEUE,
            output_queue: DEFAULT_OUTPUT_QUEUE,
        }
    }

    /// Use a custom accumulator constructor instead of a built-in backend.
    pub fn with_accumulator_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(u32, u32) -> Result<Box<dyn FrameAccumulator>> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    pub fn with_queues(mut self, input: usize, output: usize) -> Self {
        self.input_queue = input.max(1);
        self.output_queue = output.max(1);
        self
    }

    pub fn schedule(&self) -> &MergeSchedule {
        &self.schedule
    }

    /// Run the merge. The sink is always finished, also when the run aborts;
    /// an abort is reported as `PipelineAborted` carrying the counters.
    pub fn run(
        &self,
        source: Box<dyn FrameSource>,
        sink: &mut dyn FrameSink,
        reporter: &dyn ProgressReporter,
    ) -> Result<MergeReport> {
        reporter.begin_stage(PipelineStage::Merging, source.frame_count_hint());
        let frames = source.into_frames();

        let (in_tx, in_rx) = sync_channel::<Result<DecodedImage>>(self.input_queue);
        let (out_tx, out_rx) = sync_channel::<DecodedImage>(self.output_queue);

        let (merged, written, mut report) = thread::scope(|s| {
            s.spawn(move || produce(frames, in_tx));
            let writer = s.spawn(move || drain_into(sink, out_rx));

            let mut merge = MergeLoop {
                factory: &self.factory,
                entries: self.schedule.entries().iter().copied(),
                target: None,
                accumulator: None,
                in_group: 0,
                draining: false,
                input: in_rx,
                output: out_tx,
                report: MergeReport::default(),
            };
            merge.target = merge.entries.next();
            let merged = merge.run(reporter);
            let report = merge.finish();

            let written = writer.join().unwrap_or_else(|_| {
                Err(SmushError::InvalidInput("frame sink thread panicked".into()))
            });
            (merged, written, report)
        });
        reporter.finish_stage();

        let outcome = match written {
            Err(sink_error) => Err(sink_error),
            Ok(count) => {
                report.frames_written = count;
                merged
            }
        };

        match outcome {
            Ok(()) => {
                if report.schedule_remaining > 0 {
                    warn!(
                        remaining = report.schedule_remaining,
                        "Source ended before the schedule was used up"
                    );
                }
                info!(
                    frames_read = report.frames_read,
                    frames_written = report.frames_written,
                    "Merge complete"
                );
                Ok(report)
            }
            Err(source) => {
                warn!(
                    frames_read = report.frames_read,
                    frames_emitted = report.frames_emitted,
                    frames_dropped = report.frames_dropped,
                    error = %source,
                    "Merge aborted"
                );
                Err(SmushError::PipelineAborted {
                    report,
                    source: Box::new(source),
                })
            }
        }
    }
}

/// Producer: forward frames until the source ends, errors, or the loop hangs up.
fn produce(
    frames: Box<dyn Iterator<Item = Result<DecodedImage>> + Send>,
    tx: SyncSender<Result<DecodedImage>>,
) {
    for item in frames {
        let failed = item.is_err();
        if tx.send(item).is_err() || failed {
            break;
        }
    }
}

/// Sink side: push every frame, stop at the first failure, always finish.
fn drain_into(sink: &mut dyn FrameSink, rx: Receiver<DecodedImage>) -> Result<usize> {
    for image in rx {
        if let Err(e) = sink.push(image) {
            if let Err(finish_error) = sink.finish() {
                warn!(error = %finish_error, "Sink failed to finish after a write error");
            }
            return Err(e);
        }
    }
    sink.finish()
}

struct MergeLoop<'a> {
    factory: &'a AccumulatorFactory,
    entries: Copied<Iter<'a, u32>>,
    /// Size of the current group; `None` once the schedule is used up.
    target: Option<u32>,
    accumulator: Option<Box<dyn FrameAccumulator>>,
    in_group: u32,
    draining: bool,
    input: Receiver<Result<DecodedImage>>,
    output: SyncSender<DecodedImage>,
    report: MergeReport,
}

impl MergeLoop<'_> {
    fn run(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let mut state = MergeState::AwaitingFrame;
        while state != MergeState::Drained {
            state = self.step(state, reporter)?;
        }
        Ok(())
    }

    fn step(&mut self, state: MergeState, reporter: &dyn ProgressReporter) -> Result<MergeState> {
        match state {
            MergeState::AwaitingFrame | MergeState::Accumulating => self.receive(reporter),
            MergeState::Emitting => self.emit(),
            MergeState::Drained => Ok(MergeState::Drained),
        }
    }

    fn receive(&mut self, reporter: &dyn ProgressReporter) -> Result<MergeState> {
        let image = match self.input.recv() {
            Ok(item) => item?,
            Err(_) => {
                self.draining = true;
                return Ok(if self.in_group > 0 {
                    MergeState::Emitting
                } else {
                    MergeState::Drained
                });
            }
        };
        self.report.frames_read += 1;

        let accumulator = match self.accumulator.take() {
            Some(acc) => acc,
            None => {
                let acc = (self.factory)(image.width(), image.height())?;
                debug!(
                    backend = acc.name(),
                    width = acc.width(),
                    height = acc.height(),
                    "Accumulator ready"
                );
                acc
            }
        };
        let accumulator = self.accumulator.insert(accumulator);
        accumulator.add(&image)?;
        self.in_group += 1;
        if self.target.is_none() {
            self.report.unscheduled_frames += 1;
        }

        let read = self.report.frames_read as usize;
        reporter.advance(read);
        if read % PROGRESS_LOG_INTERVAL == 0 {
            info!(
                frames_read = read,
                frames_emitted = self.report.frames_emitted,
                "Merging"
            );
        }

        Ok(match self.target {
            Some(size) if self.in_group >= size => MergeState::Emitting,
            _ => MergeState::Accumulating,
        })
    }

    fn emit(&mut self) -> Result<MergeState> {
        let accumulator = self.accumulator.as_mut().ok_or(SmushError::EmptySequence)?;
        let mut image = accumulator.to_average_and_reset()?;
        image.metadata.frame_index = self.report.frames_emitted;
        self.output.send(image).map_err(|_| {
            SmushError::InvalidInput("frame sink stopped accepting frames".into())
        })?;
        self.report.frames_emitted += 1;
        self.in_group = 0;

        if self.target.is_some() {
            self.target = self.entries.next();
            if self.target.is_none() && !self.draining {
                debug!(
                    frames_read = self.report.frames_read,
                    "Schedule used up, remaining frames form one final group"
                );
            }
        }

        Ok(if self.draining {
            MergeState::Drained
        } else {
            MergeState::AwaitingFrame
        })
    }

    /// Close the accumulator and settle the counters. Drops both channel ends.
    fn finish(mut self) -> MergeReport {
        self.report.frames_dropped = self.in_group;
        self.report.schedule_remaining = match self.target {
            Some(_) => 1 + self.entries.len(),
            None => 0,
        };
        if let Some(mut accumulator) = self.accumulator.take() {
            accumulator.close();
        }
        self.report
    }
}
