//! Text formats for hand-written or externally computed schedules.
//!
//! Keyframe script, one keyframe per line:
//!
//! ```text
//! # at        output seconds
//! 0           2
//! 1:30        4.5
//! 1:02:00.5   10s
//! ```
//!
//! Ratio table, two integer columns separated by whitespace, commas or tabs:
//!
//! ```text
//! 24, 12
//! 48, 14
//! ```

use std::fmt::Write as _;
use std::time::Duration;

use crate::error::{Result, SmushError};

use super::Keyframe;

/// Parse a keyframe script.
pub fn parse_keyframes(text: &str) -> Result<Vec<Keyframe>> {
    let mut keyframes = Vec::new();
    for (line_no, line) in content_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [at, output] = fields.as_slice() else {
            return Err(line_error(line_no, "expected `<timestamp> <seconds>`"));
        };
        let at = parse_timestamp(at)
            .map_err(|_| line_error(line_no, &format!("bad timestamp `{at}`")))?;
        let output = parse_seconds(output)
            .map_err(|_| line_error(line_no, &format!("bad output duration `{output}`")))?;
        keyframes.push(Keyframe::new(at, output));
    }
    Ok(keyframes)
}

/// Parse a two-column ratio table.
pub fn parse_ratio_table(text: &str) -> Result<Vec<(u64, u64)>> {
    let mut rows = Vec::new();
    for (line_no, line) in content_lines(text) {
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let [input, output] = fields.as_slice() else {
            return Err(line_error(line_no, "expected two columns"));
        };
        let input = input
            .parse::<u64>()
            .map_err(|_| line_error(line_no, &format!("bad input index `{input}`")))?;
        let output = output
            .parse::<u64>()
            .map_err(|_| line_error(line_no, &format!("bad output index `{output}`")))?;
        rows.push((input, output));
    }
    Ok(rows)
}

/// Render a ratio table in the format [`parse_ratio_table`] reads.
pub fn format_ratio_table(rows: &[(u64, u64)]) -> String {
    let mut out = String::from("# input_frame, cumulative_output_frame\n");
    for (input, output) in rows {
        let _ = writeln!(out, "{input}, {output}");
    }
    out
}

/// `[[h:]m:]s` with an optional fractional seconds part.
pub fn parse_timestamp(text: &str) -> Result<Duration> {
    let parts: Vec<&str> = text.split(':').collect();
    let (seconds, units) = match parts.split_last() {
        Some(split) if parts.len() <= 3 => split,
        _ => return Err(SmushError::InvalidInput(format!("bad timestamp `{text}`"))),
    };
    let mut total = parse_non_negative(seconds, text)?;
    if !units.is_empty() && total >= 60.0 {
        return Err(SmushError::InvalidInput(format!(
            "seconds field out of range in `{text}`"
        )));
    }
    for (scale, unit) in [60.0, 3600.0].iter().zip(units.iter().rev()) {
        let value = unit
            .parse::<u64>()
            .map_err(|_| SmushError::InvalidInput(format!("bad timestamp `{text}`")))?;
        total += value as f64 * scale;
    }
    Ok(Duration::from_secs_f64(total))
}

fn parse_seconds(text: &str) -> Result<Duration> {
    let trimmed = text.strip_suffix('s').unwrap_or(text);
    Ok(Duration::from_secs_f64(parse_non_negative(trimmed, text)?))
}

fn parse_non_negative(field: &str, whole: &str) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(SmushError::InvalidInput(format!("bad duration `{whole}`"))),
    }
}

/// Non-empty lines with `#` comments stripped, numbered from 1.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.split('#').next().unwrap_or("").trim();
        (!line.is_empty()).then_some((i + 1, line))
    })
}

fn line_error(line_no: usize, message: &str) -> SmushError {
    SmushError::InvalidInput(format!("line {line_no}: {message}"))
}
