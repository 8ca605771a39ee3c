mod common;

use approx::assert_relative_eq;
use tempfile::{NamedTempFile, TempDir};

use smush_core::error::SmushError;
use smush_core::io::image_io::load_image;
use smush_core::io::ser::SerSource;
use smush_core::io::FrameSource;
use smush_core::pipeline::config::{ScheduleMode, SmushConfig};
use smush_core::pipeline::{plan_schedule, ratio_plan, run_merge, score_input, NoOpReporter};
use smush_core::schedule::script::format_ratio_table;

use common::{build_ser, moving_square, write_test_ser};

/// 120 RGB frames at 30 fps: a square moves for 60 frames, then everything holds still.
fn busy_then_quiet() -> NamedTempFile {
    let frames: Vec<Vec<u8>> = (0..120)
        .map(|i| {
            let image = moving_square(16, 16, i.min(59) as u32);
            (0..image.pixel_count()).flat_map(|p| image.rgb(p)).collect()
        })
        .collect();
    write_test_ser(&build_ser(16, 16, 100, &frames, Some(30.0)))
}

fn config_for(input: &NamedTempFile, output: std::path::PathBuf, mode: ScheduleMode) -> SmushConfig {
    let mut config = SmushConfig::new(input.path(), output);
    config.scoring.proxy_filter = "scale=8:8".into();
    config.schedule.mode = mode;
    config.schedule.output_fps = 30.0;
    config.schedule.output_seconds = 1.0;
    config
}

#[test]
fn test_flat_run_writes_ser() {
    let input = busy_then_quiet();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.ser");
    let config = config_for(&input, output.clone(), ScheduleMode::Flat);

    let summary = run_merge(&config).unwrap();
    assert_eq!(summary.plan.schedule.entries(), vec![4; 30].as_slice());
    assert_relative_eq!(summary.plan.source_fps, 30.0, epsilon = 1e-6);
    assert_eq!(summary.report.frames_read, 120);
    assert_eq!(summary.report.frames_written, 30);

    let written = SerSource::open(&output, 1.0).unwrap();
    assert_eq!(written.frame_count_hint(), Some(30));
    assert_relative_eq!(written.frame_rate(), 30.0, epsilon = 1e-6);
}

#[test]
fn test_threshold_plan_follows_activity() {
    let input = busy_then_quiet();
    let config = config_for(&input, "unused.ser".into(), ScheduleMode::Threshold);

    let plan = plan_schedule(&config, &NoOpReporter).unwrap();
    let entries = plan.schedule.entries();
    assert_eq!(plan.schedule.total_frames(), 120);
    assert!(entries.last().unwrap() > entries.first().unwrap(), "{entries:?}");
    assert!(*entries.last().unwrap() >= 60, "{entries:?}");
}

#[test]
fn test_enhanced_plan_fits_target() {
    let input = busy_then_quiet();
    let config = config_for(&input, "unused.ser".into(), ScheduleMode::Enhanced);

    let plan = plan_schedule(&config, &NoOpReporter).unwrap();
    assert_eq!(plan.schedule.total_frames(), 120);
    assert!(plan.schedule.len() <= 30);
}

#[test]
fn test_keyframe_run() {
    let input = busy_then_quiet();
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("keys.txt");
    std::fs::write(&script, "# two seconds of action, then the rest\n0 2\n2 0.5\n4 0\n").unwrap();

    let mut config = config_for(&input, dir.path().join("out.ser"), ScheduleMode::Keyframes);
    config.schedule.keyframes = Some(script);

    let summary = run_merge(&config).unwrap();
    // 60 frames at 1x, then 60 frames into 15 outputs.
    let mut expected = vec![1; 60];
    expected.extend(vec![4; 15]);
    assert_eq!(summary.plan.schedule.entries(), expected.as_slice());
    assert_eq!(summary.report.frames_written, 75);
}

#[test]
fn test_ratio_table_run() {
    let input = busy_then_quiet();
    let dir = TempDir::new().unwrap();
    let table = dir.path().join("plan.txt");
    std::fs::write(&table, "60, 30\n120, 35\n").unwrap();

    let mut config = config_for(&input, dir.path().join("out.ser"), ScheduleMode::RatioTable);
    config.schedule.ratio_table = Some(table);

    let summary = run_merge(&config).unwrap();
    assert_eq!(summary.plan.schedule.len(), 35);
    assert_eq!(summary.report.frames_written, 35);
}

#[test]
fn test_ratio_plan_covers_exactly_the_input() {
    let input = busy_then_quiet();
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&input, dir.path().join("out.ser"), ScheduleMode::RatioTable);
    // 120 frames in chunks of 50 leave a 20-frame tail.
    config.schedule.chunk_size = 50;

    let scores = score_input(&config, &NoOpReporter).unwrap();
    let rows = ratio_plan(&scores, &config).unwrap();
    assert_eq!(rows.last().unwrap().0, 120);

    let table = dir.path().join("plan.txt");
    std::fs::write(&table, format_ratio_table(&rows)).unwrap();
    config.schedule.ratio_table = Some(table);

    let summary = run_merge(&config).unwrap();
    assert_eq!(summary.plan.schedule.total_frames(), 120);
    assert_eq!(summary.report.frames_read, 120);
    assert_eq!(summary.report.schedule_remaining, 0);
    assert_eq!(summary.report.unscheduled_frames, 0);
}

#[test]
fn test_keyframe_mode_needs_script() {
    let input = busy_then_quiet();
    let config = config_for(&input, "unused.ser".into(), ScheduleMode::Keyframes);
    assert!(matches!(
        plan_schedule(&config, &NoOpReporter),
        Err(SmushError::InvalidInput(_))
    ));
}

#[test]
fn test_mono_input_merges_to_png() {
    let frames: Vec<Vec<u8>> = (0..6).map(|i| vec![i as u8 * 20; 4 * 3]).collect();
    let input = write_test_ser(&build_ser(4, 3, 0, &frames, None));
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("frames");

    let mut config = config_for(&input, output.clone(), ScheduleMode::Flat);
    config.source.default_fps = 6.0;
    config.schedule.output_fps = 1.0;
    config.schedule.output_seconds = 2.0;

    let summary = run_merge(&config).unwrap();
    assert_eq!(summary.report.frames_written, 2);
    // Levels 0, 20, 40 average to 20; 60, 80, 100 to 80.
    assert_eq!(load_image(&output.join("frame_000000.png")).unwrap().rgb(0), [20, 20, 20]);
    assert_eq!(load_image(&output.join("frame_000001.png")).unwrap().rgb(5), [80, 80, 80]);
}

#[test]
fn test_scores_are_cached() {
    let input = busy_then_quiet();
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("scores.toml");
    let mut config = config_for(&input, "unused.ser".into(), ScheduleMode::Threshold);
    config.scoring.cache = Some(cache.clone());

    let first = score_input(&config, &NoOpReporter).unwrap();
    assert!(cache.exists());
    let second = score_input(&config, &NoOpReporter).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.frame_count(), 120);
}
