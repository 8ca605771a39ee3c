use tracing::info;

use crate::activity::ActivityScores;
use crate::error::{Result, SmushError};
use crate::io::filter::{FilterChain, FilterStep, PixelFormat};
use crate::io::score_cache::{ScoreCache, SourceKey};
use crate::io::ser::SerSource;
use crate::io::{create_sink, FrameSource};
use crate::schedule::script::{parse_keyframes, parse_ratio_table};
use crate::schedule::{
    cumulative_plan, direct_readout, flat_schedule, keyframe_schedule, merge_counts_from_levels,
    ratio_table_schedule, search_exponent, threshold_bucket, MergeSchedule,
};
use crate::smooth::enhance_variability;

use super::config::{ScheduleMode, SmushConfig};
use super::merge::MergePipeline;
use super::scoring::score_source;
use super::types::{MergeReport, NoOpReporter, PipelineStage, ProgressReporter};

/// A schedule and how it was obtained.
#[derive(Clone, Debug)]
pub struct PlanOutcome {
    pub schedule: MergeSchedule,
    pub mode: ScheduleMode,
    pub source_fps: f64,
    pub output_fps: f64,
    /// Exponent chosen by the enhanced search, if one was used.
    pub exponent: Option<f64>,
}

impl PlanOutcome {
    pub fn output_seconds(&self) -> f64 {
        self.schedule.output_seconds(self.output_fps)
    }
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub plan: PlanOutcome,
    pub report: MergeReport,
}

/// Open the input with an optional filter chain.
pub fn open_source(config: &SmushConfig, filter: Option<&str>) -> Result<SerSource> {
    let source = SerSource::open(&config.input, config.source.default_fps)?;
    let chain = match filter {
        Some(text) => FilterChain::parse(text)?,
        None => FilterChain::default(),
    };
    Ok(source.with_filter(chain))
}

/// Full-resolution source for the merge pass. Gray input is widened to
/// colour because accumulators only sum colour layouts.
pub fn open_merge_source(config: &SmushConfig) -> Result<SerSource> {
    let mut chain = match config.source.filter.as_deref() {
        Some(text) => FilterChain::parse(text)?,
        None => FilterChain::default(),
    };
    let probe = SerSource::open(&config.input, config.source.default_fps)?;
    if probe.header().planes_per_pixel() == 1 {
        chain = chain.then(FilterStep::Format(PixelFormat::Bgr24));
    }
    Ok(probe.with_filter(chain))
}

/// Pass 1, reusing cached scores when the cache holds them for this input.
pub fn score_input(config: &SmushConfig, reporter: &dyn ProgressReporter) -> Result<ActivityScores> {
    let label = config.scoring.proxy_filter.as_str();
    let proxy = || -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(open_source(config, Some(label))?))
    };

    let Some(cache_path) = config.scoring.cache.as_deref() else {
        return score_source(proxy()?, config.buffering.input_queue, reporter);
    };

    let key = SourceKey::of(&config.input)?;
    let mut cache = ScoreCache::load(cache_path)?;
    if let Some(scores) = cache.get(label, &key) {
        info!(path = %cache_path.display(), "Using cached activity scores");
        return Ok(ActivityScores::new(scores.to_vec()));
    }

    let scores = score_source(proxy()?, config.buffering.input_queue, reporter)?;
    cache.insert(label, key, scores.pairs().to_vec());
    cache.save(cache_path)?;
    Ok(scores)
}

/// Turn activity scores into a schedule for the score-driven modes.
pub fn schedule_from_scores(
    scores: &ActivityScores,
    config: &SmushConfig,
) -> Result<(MergeSchedule, Option<f64>)> {
    let per_frame = scores.per_frame();
    if per_frame.is_empty() {
        return Err(SmushError::EmptySequence);
    }
    let target = config.schedule.target_output_frames();

    match config.schedule.mode {
        ScheduleMode::Threshold => Ok((threshold_bucket(&per_frame, target)?, None)),
        ScheduleMode::Enhanced => {
            let smoothed = config.smoothing.smooth(&per_frame);
            let search = search_exponent(
                &smoothed,
                target,
                config.schedule.single_source_frames,
                &config.schedule.exponent_sweep,
                &config.variability,
            )?;
            Ok((search.schedule, search.exponent))
        }
        ScheduleMode::Direct => {
            let smoothed = config.smoothing.smooth(&per_frame);
            let levels = enhance_variability(&smoothed, &config.variability)?;
            let counts = merge_counts_from_levels(&levels, &config.variability);
            Ok((
                direct_readout(&timeline_groups(&counts))?,
                Some(config.variability.exponent),
            ))
        }
        ScheduleMode::Flat => Ok((flat_schedule(per_frame.len(), target)?, None)),
        mode @ (ScheduleMode::Keyframes | ScheduleMode::RatioTable) => Err(
            SmushError::InvalidInput(format!("{mode} schedules are not derived from scores")),
        ),
    }
}

/// Walk the timeline taking each frame's merge count as the next group size.
fn timeline_groups(counts: &[u32]) -> Vec<u32> {
    let mut groups = Vec::new();
    let mut pos = 0usize;
    while pos < counts.len() {
        let size = (counts[pos].max(1) as usize).min(counts.len() - pos);
        groups.push(size as u32);
        pos += size;
    }
    groups
}

/// Cumulative ratio table from chunked activity, for out-of-process planning.
pub fn ratio_plan(scores: &ActivityScores, config: &SmushConfig) -> Result<Vec<(u64, u64)>> {
    let per_frame = scores.per_frame();
    if per_frame.is_empty() {
        return Err(SmushError::EmptySequence);
    }
    let chunk = config.schedule.chunk_size.max(1);
    let chunk_means: Vec<f64> = per_frame
        .chunks(chunk)
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect();
    let smoothed = config.smoothing.smooth(&chunk_means);
    let levels = enhance_variability(&smoothed, &config.variability)?;
    let counts = merge_counts_from_levels(&levels, &config.variability);
    Ok(cumulative_plan(&counts, chunk, per_frame.len() as u64))
}

/// Compute the schedule the configured mode asks for.
pub fn plan_schedule(config: &SmushConfig, reporter: &dyn ProgressReporter) -> Result<PlanOutcome> {
    let probe = SerSource::open(&config.input, config.source.default_fps)?;
    let source_fps = probe.frame_rate();
    let output_fps = config.schedule.output_fps;
    let mode = config.schedule.mode;

    let (schedule, exponent) = if mode.needs_scores() {
        let scores = score_input(config, reporter)?;
        reporter.begin_stage(PipelineStage::Planning, None);
        let planned = schedule_from_scores(&scores, config)?;
        reporter.finish_stage();
        planned
    } else {
        reporter.begin_stage(PipelineStage::Planning, None);
        let schedule = match mode {
            ScheduleMode::Keyframes => {
                let path = required_path(config.schedule.keyframes.as_deref(), "keyframes")?;
                let keyframes = parse_keyframes(&std::fs::read_to_string(path)?)?;
                keyframe_schedule(&keyframes, source_fps, output_fps)?
            }
            ScheduleMode::RatioTable => {
                let path = required_path(config.schedule.ratio_table.as_deref(), "ratio_table")?;
                ratio_table_schedule(&parse_ratio_table(&std::fs::read_to_string(path)?)?)?
            }
            _ => {
                let frames = probe.frame_count_hint().unwrap_or(0);
                flat_schedule(frames, config.schedule.target_output_frames())?
            }
        };
        reporter.finish_stage();
        (schedule, None)
    };

    let outcome = PlanOutcome {
        schedule,
        mode,
        source_fps,
        output_fps,
        exponent,
    };
    info!(
        mode = %mode,
        outputs = outcome.schedule.len(),
        output_seconds = outcome.output_seconds(),
        min_merge = outcome.schedule.min_merge(),
        max_merge = outcome.schedule.max_merge(),
        "Schedule planned"
    );
    Ok(outcome)
}

fn required_path<'a>(
    path: Option<&'a std::path::Path>,
    key: &str,
) -> Result<&'a std::path::Path> {
    path.ok_or_else(|| {
        SmushError::InvalidInput(format!("schedule mode needs `schedule.{key}` to be set"))
    })
}

/// Plan, then merge the input into the configured output, with progress reporting.
pub fn run_merge_reported(
    config: &SmushConfig,
    reporter: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let plan = plan_schedule(config, reporter)?;
    let source = open_merge_source(config)?;
    let mut sink = create_sink(&config.output, plan.output_fps)?;

    let report = MergePipeline::new(plan.schedule.clone(), config.accumulator)
        .with_queues(config.buffering.input_queue, config.buffering.output_queue)
        .run(Box::new(source), sink.as_mut(), reporter)?;

    Ok(RunSummary { plan, report })
}

/// Plan and merge without progress reporting.
pub fn run_merge(config: &SmushConfig) -> Result<RunSummary> {
    run_merge_reported(config, &NoOpReporter)
}
