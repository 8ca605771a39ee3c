#![allow(dead_code)]

use smush_core::frame::DecodedImage;
use smush_core::io::ser::SER_HEADER_SIZE;

/// Build a SER file header for 8-bit frames.
///
/// `color_id`: 0=MONO, 100=RGB, 101=BGR
pub fn build_ser_header(width: u32, height: u32, num_frames: usize, color_id: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID (4 bytes)
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    // PixelDepth
    buf.extend_from_slice(&8i32.to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete SER file from raw frame bytes, with an optional timestamp trailer
/// spaced for `fps`.
pub fn build_ser(
    width: u32,
    height: u32,
    color_id: i32,
    frames: &[Vec<u8>],
    fps: Option<f64>,
) -> Vec<u8> {
    let mut buf = build_ser_header(width, height, frames.len(), color_id);
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    if let Some(fps) = fps {
        for i in 0..frames.len() {
            let ticks = (i as f64 * 10_000_000.0 / fps).round() as u64;
            buf.extend_from_slice(&ticks.to_le_bytes());
        }
    }
    buf
}

/// Write a SER buffer to a temporary file. Keep the handle alive while reading.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".ser")
        .tempfile()
        .expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// Uniformly coloured `IntRgb` frame.
pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DecodedImage {
    DecodedImage::from_fn(width, height, |_, _| rgb).expect("valid frame")
}

/// `count` frames of uniform grey whose level follows `level(i)`.
pub fn gray_levels(width: u32, height: u32, count: usize, level: impl Fn(usize) -> u8) -> Vec<DecodedImage> {
    (0..count)
        .map(|i| {
            let v = level(i);
            solid(width, height, [v, v, v])
        })
        .collect()
}

/// Red square on blue, its column shifted by `offset`.
pub fn moving_square(width: u32, height: u32, offset: u32) -> DecodedImage {
    DecodedImage::from_fn(width, height, |x, y| {
        let sx = (x + width - offset % width) % width;
        if sx < width / 4 && y < height / 4 {
            [220, 20, 20]
        } else {
            [20, 20, 200]
        }
    })
    .expect("valid frame")
}
