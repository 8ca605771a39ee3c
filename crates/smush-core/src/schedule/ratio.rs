use tracing::debug;

use crate::error::{Result, SmushError};

use super::MergeSchedule;

/// Schedule from a `(input_frame_index, cumulative_output_index)` table.
///
/// Rows are read against an implicit `(0, 0)` start. Each span of input frames
/// is spread over its output count with integer-exact boundaries, so the
/// groups of one span always add up to the span. A row that adds no outputs
/// carries its frames into the next span; frames still pending after the last
/// row become a final group.
pub fn ratio_table_schedule(rows: &[(u64, u64)]) -> Result<MergeSchedule> {
    let mut entries = Vec::new();
    let (mut prev_in, mut prev_out) = (0u64, 0u64);
    let mut carried = 0u64;

    for (span, &(input, output)) in rows.iter().enumerate() {
        if input <= prev_in && !(span == 0 && input == 0 && output == 0) {
            return Err(SmushError::ScheduleOrder {
                previous: format!("input {prev_in}"),
                next: format!("input {input}"),
            });
        }
        if output < prev_out {
            return Err(SmushError::ScheduleOrder {
                previous: format!("output {prev_out}"),
                next: format!("output {output}"),
            });
        }

        let inputs = input - prev_in + carried;
        let outputs = output - prev_out;
        prev_in = input;
        prev_out = output;

        if outputs == 0 {
            carried = inputs;
            continue;
        }
        if outputs > inputs {
            return Err(SmushError::ScheduleRate {
                span,
                speedup: inputs as f64 / outputs as f64,
            });
        }
        for k in 0..outputs {
            let group = (k + 1) * inputs / outputs - k * inputs / outputs;
            entries.push(group.min(u32::MAX as u64) as u32);
        }
        carried = 0;
    }

    if carried > 0 {
        entries.push(carried.min(u32::MAX as u64) as u32);
    }

    debug!(rows = rows.len(), outputs = entries.len(), "Ratio table schedule");
    MergeSchedule::new(entries)
}

/// Turn per-chunk merge counts into a cumulative ratio table.
///
/// Every chunk covers `chunk_size` input frames, the last one only what is
/// left of `total_frames`, and contributes `covered / merge` output frames;
/// the table records running totals. Counts past the end of the input are
/// ignored.
pub fn cumulative_plan(merge_counts: &[u32], chunk_size: usize, total_frames: u64) -> Vec<(u64, u64)> {
    let mut inputs = 0u64;
    let mut outputs = 0.0f64;
    merge_counts
        .iter()
        .map_while(|&merge| {
            let covered = (chunk_size as u64).min(total_frames - inputs);
            if covered == 0 {
                return None;
            }
            inputs += covered;
            outputs += covered as f64 / merge.max(1) as f64;
            Some((inputs, outputs.floor() as u64))
        })
        .collect()
}
