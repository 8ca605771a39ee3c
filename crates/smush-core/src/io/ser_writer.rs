use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::SER_TICKS_PER_SECOND;
use crate::error::{Result, SmushError};
use crate::frame::DecodedImage;
use crate::io::ser::{SerHeader, SER_COLOR_RGB, SER_FRAME_COUNT_OFFSET, SER_HEADER_SIZE, SER_MAGIC};
use crate::io::{check_sink_dimensions, FrameSink};

/// Writes a valid SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    header: SerHeader,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frames_written: 0,
        })
    }

    /// Write a single raw frame (bytes must match the header's frame size).
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.header.frame_byte_size()?;
        if data.len() != expected {
            return Err(SmushError::InvalidInput(format!(
                "SER frame is {} bytes, header expects {expected}",
                data.len()
            )));
        }
        self.writer.write_all(data)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Write the timestamp trailer (one u64 per frame, little-endian).
    pub fn write_timestamps(&mut self, timestamps: &[u64]) -> Result<()> {
        for &ts in timestamps {
            self.writer.write_all(&ts.to_le_bytes())?;
        }
        Ok(())
    }

    /// Patch the header's frame count with the number of frames written, then flush.
    pub fn finalize(mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(SER_FRAME_COUNT_OFFSET))?;
        file.write_all(&(self.frames_written as i32).to_le_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// RGB SER output whose timestamp trailer encodes the output frame rate.
pub struct SerSink {
    path: PathBuf,
    fps: f64,
    writer: Option<SerWriter>,
    dimensions: Option<(u32, u32)>,
    written: usize,
    finished: bool,
}

impl SerSink {
    pub fn create(path: &Path, fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SmushError::InvalidInput(format!(
                "output frame rate must be positive, got {fps}"
            )));
        }
        // Fail early on unwritable paths; the header is rewritten on the first frame.
        File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            fps,
            writer: None,
            dimensions: None,
            written: 0,
            finished: false,
        })
    }

    fn timestamps(&self) -> Vec<u64> {
        (0..self.written)
            .map(|i| (i as f64 * SER_TICKS_PER_SECOND / self.fps).round() as u64)
            .collect()
    }
}

impl FrameSink for SerSink {
    fn push(&mut self, image: DecodedImage) -> Result<()> {
        check_sink_dimensions(&mut self.dimensions, &image)?;
        if self.writer.is_none() {
            let header = SerHeader::new_8bit(SER_COLOR_RGB, image.width(), image.height());
            self.writer = Some(SerWriter::create(&self.path, &header)?);
        }
        let bytes: Vec<u8> = (0..image.pixel_count()).flat_map(|i| image.rgb(i)).collect();
        if let Some(writer) = self.writer.as_mut() {
            writer.write_raw_frame(&bytes)?;
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        if self.finished {
            return Ok(self.written);
        }
        self.finished = true;
        let timestamps = self.timestamps();
        match self.writer.take() {
            Some(mut writer) => {
                writer.write_timestamps(&timestamps)?;
                writer.finalize()?;
            }
            // No frames arrived: leave a header-only file with a zero frame count.
            None => {
                let header = SerHeader::new_8bit(SER_COLOR_RGB, 0, 0);
                SerWriter::create(&self.path, &header)?.finalize()?;
            }
        }
        debug!(path = %self.path.display(), frames = self.written, "SER output finished");
        Ok(self.written)
    }
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    w.write_all(SER_MAGIC)?;
    // LuID
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&header.color_id.to_le_bytes())?;
    // 0 = little-endian
    let le_flag: i32 = if header.little_endian { 0 } else { 1 };
    w.write_all(&le_flag.to_le_bytes())?;
    w.write_all(&(header.width as i32).to_le_bytes())?;
    w.write_all(&(header.height as i32).to_le_bytes())?;
    w.write_all(&(header.pixel_depth as i32).to_le_bytes())?;
    w.write_all(&(header.frame_count as i32).to_le_bytes())?;
    write_fixed_string(w, &header.observer, 40)?;
    write_fixed_string(w, &header.instrument, 40)?;
    write_fixed_string(w, &header.telescope, 40)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(
        14 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 40 + 40 + 40 + 8 + 8,
        SER_HEADER_SIZE
    );
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str, len: usize) -> Result<()> {
    let bytes = s.as_bytes();
    let to_write = bytes.len().min(len);
    w.write_all(&bytes[..to_write])?;
    w.write_all(&vec![0u8; len - to_write])?;
    Ok(())
}
