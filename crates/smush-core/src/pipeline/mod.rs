pub mod config;
mod merge;
mod orchestrator;
pub mod scoring;
mod types;

pub use merge::{AccumulatorFactory, MergePipeline, MergeState};
pub use orchestrator::{
    open_merge_source, open_source, plan_schedule, ratio_plan, run_merge, run_merge_reported,
    schedule_from_scores, score_input, PlanOutcome, RunSummary,
};
pub use types::{MergeReport, NoOpReporter, PipelineStage, ProgressReporter};
