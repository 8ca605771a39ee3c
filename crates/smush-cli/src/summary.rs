use console::Style;
use smush_core::pipeline::config::SmushConfig;
use smush_core::pipeline::{MergeReport, PlanOutcome};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            warning: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_plan_summary(config: &SmushConfig, plan: &PlanOutcome) {
    let s = Styles::new();
    let schedule = &plan.schedule;

    println!();
    println!("  {}", s.title.apply_to("Smush Plan"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(plan.mode)
    );
    if let Some(exponent) = plan.exponent {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Exponent"),
            s.value.apply_to(exponent)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Schedule"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Source"),
        s.value.apply_to(format!(
            "{} frames @ {:.2} fps",
            schedule.total_frames(),
            plan.source_fps
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Output"),
        s.value.apply_to(format!(
            "{} frames @ {:.2} fps ({:.1}s)",
            schedule.len(),
            plan.output_fps,
            plan.output_seconds()
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Merge"),
        s.value.apply_to(format!(
            "{}x .. {}x",
            schedule.min_merge(),
            schedule.max_merge()
        ))
    );
    println!();
}

pub fn print_run_summary(config: &SmushConfig, report: &MergeReport) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Merge"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Backend"),
        s.method.apply_to(config.accumulator)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Read"),
        s.value.apply_to(report.frames_read)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Written"),
        s.value.apply_to(report.frames_written)
    );
    if report.schedule_remaining > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Unused"),
            s.warning
                .apply_to(format!("{} schedule entries", report.schedule_remaining))
        );
    }
    if report.unscheduled_frames > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Extra"),
            s.warning.apply_to(format!(
                "{} frames merged into the last output",
                report.unscheduled_frames
            ))
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Saved to"),
        s.path.apply_to(config.output.display())
    );
    println!();
}
