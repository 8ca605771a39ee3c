mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smush_core::accumulate::cpu::CpuAccumulator;
use smush_core::accumulate::{AccumulatorKind, FrameAccumulator};
use smush_core::error::{Result, SmushError};
use smush_core::frame::DecodedImage;
use smush_core::io::memory::{MemorySink, MemorySource};
use smush_core::io::FrameSink;
use smush_core::pipeline::{MergePipeline, MergeReport, NoOpReporter};
use smush_core::schedule::{threshold_bucket, MergeSchedule};

use common::{gray_levels, solid};

fn run(
    schedule: Vec<u32>,
    frames: Vec<DecodedImage>,
    kind: AccumulatorKind,
) -> (Result<MergeReport>, MemorySink) {
    let mut sink = MemorySink::new();
    let pipeline = MergePipeline::new(MergeSchedule::new(schedule).unwrap(), kind);
    let result = pipeline.run(
        Box::new(MemorySource::new(frames, 30.0)),
        &mut sink,
        &NoOpReporter,
    );
    (result, sink)
}

#[test]
fn test_three_hundred_frames_into_thirty() {
    let frames = gray_levels(4, 4, 300, |i| (i % 256) as u8);
    let schedule = threshold_bucket(&vec![1.0; 300], 30).unwrap();

    let (result, sink) = run(schedule.entries().to_vec(), frames, AccumulatorKind::Cpu);
    let report = result.unwrap();

    assert_eq!(report.frames_read, 300);
    assert_eq!(report.frames_emitted, 30);
    assert_eq!(report.frames_written, 30);
    assert_eq!(report.schedule_remaining, 0);
    assert_eq!(report.unscheduled_frames, 0);
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 30);

    // First group is levels 0..=9, mean 4.5 truncated.
    assert_eq!(sink.frames()[0].rgb(0), [4, 4, 4]);
    assert_eq!(sink.frames()[1].rgb(0), [14, 14, 14]);
    for (i, frame) in sink.frames().iter().enumerate() {
        assert_eq!(frame.metadata.frame_index, i);
    }
}

#[test]
fn test_backends_produce_same_output() {
    let frames = gray_levels(8, 8, 40, |i| (i * 7 % 256) as u8);
    let schedule = vec![3, 1, 7, 9, 20];
    let (cpu, cpu_sink) = run(schedule.clone(), frames.clone(), AccumulatorKind::Cpu);
    let (array, array_sink) = run(schedule, frames, AccumulatorKind::Array);
    assert_eq!(cpu.unwrap(), array.unwrap());
    assert_eq!(cpu_sink.frames(), array_sink.frames());
}

#[test]
fn test_extra_frames_form_one_final_group() {
    let frames = gray_levels(2, 2, 7, |i| (i * 10) as u8);
    let (result, sink) = run(vec![2, 2], frames, AccumulatorKind::Cpu);
    let report = result.unwrap();

    assert_eq!(report.frames_emitted, 3);
    assert_eq!(report.unscheduled_frames, 3);
    // Frames 4, 5, 6 -> levels 40, 50, 60.
    assert_eq!(sink.frames()[2].rgb(0), [50, 50, 50]);
}

#[test]
fn test_short_source_emits_partial_group() {
    let frames = gray_levels(2, 2, 3, |i| (i * 10) as u8);
    let (result, sink) = run(vec![2, 2, 2], frames, AccumulatorKind::Cpu);
    let report = result.unwrap();

    assert_eq!(report.frames_emitted, 2);
    assert_eq!(report.schedule_remaining, 1);
    assert_eq!(sink.frames()[1].rgb(0), [20, 20, 20]);
}

#[test]
fn test_empty_source() {
    let (result, sink) = run(vec![5, 5], Vec::new(), AccumulatorKind::Cpu);
    let report = result.unwrap();
    assert_eq!(report.frames_read, 0);
    assert_eq!(report.frames_written, 0);
    assert_eq!(report.schedule_remaining, 2);
    assert!(sink.is_finished());
}

#[test]
fn test_source_error_aborts_with_counters() {
    let mut frames: Vec<Result<DecodedImage>> = (0..5)
        .map(|_| Ok(solid(2, 2, [9, 9, 9])))
        .collect();
    frames.push(Err(SmushError::InvalidSer("truncated frame".into())));
    frames.push(Ok(solid(2, 2, [9, 9, 9])));

    let mut sink = MemorySink::new();
    let pipeline = MergePipeline::new(MergeSchedule::new(vec![2; 10]).unwrap(), AccumulatorKind::Cpu);
    let result = pipeline.run(
        Box::new(MemorySource::from_results(frames, 30.0)),
        &mut sink,
        &NoOpReporter,
    );

    match result {
        Err(SmushError::PipelineAborted { report, source }) => {
            assert!(matches!(*source, SmushError::InvalidSer(_)));
            assert_eq!(report.frames_read, 5);
            assert_eq!(report.frames_emitted, 2);
            assert_eq!(report.frames_written, 2);
            assert_eq!(report.frames_dropped, 1);
        }
        other => panic!("expected PipelineAborted, got {other:?}"),
    }
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 2);
}

#[test]
fn test_frame_size_change_aborts() {
    let frames = vec![solid(2, 2, [1, 1, 1]), solid(2, 2, [1, 1, 1]), solid(3, 2, [1, 1, 1])];
    let (result, sink) = run(vec![1, 1, 1], frames, AccumulatorKind::Cpu);
    match result {
        Err(SmushError::PipelineAborted { report, .. }) => {
            assert_eq!(report.frames_emitted, 2);
        }
        other => panic!("expected PipelineAborted, got {other:?}"),
    }
    assert!(sink.is_finished());
}

/// Sink that fails on its second frame.
#[derive(Default)]
struct FailingSink {
    pushed: usize,
    finished: bool,
}

impl FrameSink for FailingSink {
    fn push(&mut self, _image: DecodedImage) -> Result<()> {
        if self.pushed == 1 {
            return Err(SmushError::Io(std::io::Error::other("disk full")));
        }
        self.pushed += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        self.finished = true;
        Ok(self.pushed)
    }
}

#[test]
fn test_sink_error_is_reported_and_sink_finished() {
    let frames = gray_levels(2, 2, 50, |i| i as u8);
    let mut sink = FailingSink::default();
    let pipeline = MergePipeline::new(MergeSchedule::new(vec![1; 50]).unwrap(), AccumulatorKind::Cpu)
        .with_queues(1, 1);
    let result = pipeline.run(
        Box::new(MemorySource::new(frames, 30.0)),
        &mut sink,
        &NoOpReporter,
    );

    match result {
        Err(SmushError::PipelineAborted { source, .. }) => {
            assert!(matches!(*source, SmushError::Io(_)), "{source}");
        }
        other => panic!("expected PipelineAborted, got {other:?}"),
    }
    assert!(sink.finished);
    assert_eq!(sink.pushed, 1);
}

#[test]
fn test_custom_accumulator_factory() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let pipeline = MergePipeline::new(MergeSchedule::new(vec![4, 4]).unwrap(), AccumulatorKind::Gpu)
        .with_accumulator_factory(move |w, h| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CpuAccumulator::new(w, h)?) as Box<dyn FrameAccumulator>)
        });

    let mut sink = MemorySink::new();
    let report = pipeline
        .run(
            Box::new(MemorySource::new(gray_levels(3, 3, 8, |_| 77), 30.0)),
            &mut sink,
            &NoOpReporter,
        )
        .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(report.frames_written, 2);
    assert_eq!(sink.frames()[1].rgb(4), [77, 77, 77]);
}
