use indicatif::{ProgressBar, ProgressStyle};
use smush_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one terminal progress bar from pipeline stage updates.
pub struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    fn style(known_total: bool) -> ProgressStyle {
        let template = if known_total {
            "{msg:20} [{bar:40}] {pos}/{len}"
        } else {
            "{msg:20} {spinner} {pos}"
        };
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.pb.reset();
        self.pb.set_style(Self::style(total_items.is_some()));
        match total_items {
            Some(total) => self.pb.set_length(total as u64),
            None => self.pb.unset_length(),
        }
        self.pb.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.pb.finish();
    }
}
