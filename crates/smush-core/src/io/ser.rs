use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use tracing::debug;

use crate::consts::SER_TICKS_PER_SECOND;
use crate::error::{Result, SmushError};
use crate::frame::{DecodedImage, FrameMetadata, PixelData, PixelLayout};
use crate::io::filter::FilterChain;
use crate::io::FrameSource;

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// Byte offset of the frame count field, patched when a writer finishes.
pub const SER_FRAME_COUNT_OFFSET: u64 = 38;

pub const SER_COLOR_MONO: i32 = 0;
pub const SER_COLOR_RGB: i32 = 100;
pub const SER_COLOR_BGR: i32 = 101;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// 8-bit header for a writer; the frame count is filled in later.
    pub fn new_8bit(color_id: i32, width: u32, height: u32) -> Self {
        Self {
            color_id,
            little_endian: true,
            width,
            height,
            pixel_depth: 8,
            frame_count: 0,
            observer: String::new(),
            instrument: String::new(),
            telescope: "smush".into(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            SER_COLOR_RGB | SER_COLOR_BGR => 3,
            _ => 1,
        }
    }

    pub fn frame_byte_size(&self) -> Result<usize> {
        let bytes_per_pixel = self.bytes_per_pixel_plane() * self.planes_per_pixel();
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
            .ok_or(SmushError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
    }

    /// Human-readable colour format.
    pub fn color_name(&self) -> &'static str {
        match self.color_id {
            SER_COLOR_MONO => "mono",
            8..=11 => "bayer (read as mono)",
            SER_COLOR_RGB => "RGB",
            SER_COLOR_BGR => "BGR",
            _ => "unknown (read as mono)",
        }
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(SmushError::InvalidSer("File too small for SER header".into()));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(SmushError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;

        let expected_data_size =
            SER_HEADER_SIZE + header.frame_byte_size()? * header.frame_count as usize;
        if mmap.len() < expected_data_size {
            return Err(SmushError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(SmushError::InvalidInput(format!(
                "frame {index} out of range ({count} frames)"
            )));
        }
        let size = self.header.frame_byte_size()?;
        let offset = SER_HEADER_SIZE + index * size;
        Ok(&self.mmap[offset..offset + size])
    }

    /// Layout frames decode to: colour files become `ThreeByteBgr`, everything else `ByteGray`.
    pub fn layout(&self) -> Result<PixelLayout> {
        if self.header.pixel_depth > 8 {
            return Err(SmushError::UnsupportedPixelLayout(format!(
                "{}-bit SER frames, only 8-bit input is supported",
                self.header.pixel_depth
            )));
        }
        Ok(match self.header.planes_per_pixel() {
            3 => PixelLayout::ThreeByteBgr,
            _ => PixelLayout::ByteGray,
        })
    }

    /// Decode a single frame.
    pub fn read_frame(&self, index: usize) -> Result<DecodedImage> {
        let layout = self.layout()?;
        let raw = self.frame_raw(index)?;
        let bytes = if self.header.color_id == SER_COLOR_RGB {
            raw.chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect()
        } else {
            raw.to_vec()
        };

        let mut image = DecodedImage::new(
            self.header.width,
            self.header.height,
            layout,
            PixelData::Bytes(bytes),
        )?;
        image.metadata = FrameMetadata {
            frame_index: index,
            timestamp_us: self.read_timestamp(index).map(|ticks| ticks / 10),
        };
        Ok(image)
    }

    /// Per-frame timestamp (100 ns ticks) from the optional trailer.
    pub fn read_timestamp(&self, index: usize) -> Option<u64> {
        let trailer_offset = SER_HEADER_SIZE
            + self.header.frame_byte_size().ok()? * self.header.frame_count as usize;
        let ts_offset = trailer_offset + index * 8;
        if ts_offset + 8 <= self.mmap.len() {
            let bytes = &self.mmap[ts_offset..ts_offset + 8];
            Some(u64::from_le_bytes(bytes.try_into().ok()?))
        } else {
            None
        }
    }

    /// Frame rate implied by the first and last trailer timestamps.
    pub fn timestamp_frame_rate(&self) -> Option<f64> {
        let count = self.frame_count();
        if count < 2 {
            return None;
        }
        let first = self.read_timestamp(0)?;
        let last = self.read_timestamp(count - 1)?;
        if last <= first {
            return None;
        }
        let seconds = (last - first) as f64 / SER_TICKS_PER_SECOND;
        Some((count - 1) as f64 / seconds)
    }

    /// Iterator over all frames.
    pub fn frames(&self) -> impl Iterator<Item = Result<DecodedImage>> + '_ {
        (0..self.frame_count()).map(move |i| self.read_frame(i))
    }
}

/// A SER file as a [`FrameSource`], with an optional filter chain per frame.
pub struct SerSource {
    path: PathBuf,
    reader: SerReader,
    frame_rate: f64,
    filter: Option<FilterChain>,
}

impl SerSource {
    /// Open `path`. `default_fps` is used when the file has no usable timestamps.
    pub fn open(path: &Path, default_fps: f64) -> Result<Self> {
        let reader = SerReader::open(path)?;
        reader.layout()?;
        let frame_rate = match reader.timestamp_frame_rate() {
            Some(fps) => fps,
            None => {
                debug!(path = %path.display(), default_fps, "No SER timestamps, using default frame rate");
                default_fps
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            frame_rate,
            filter: None,
        })
    }

    pub fn with_filter(mut self, filter: FilterChain) -> Self {
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &SerHeader {
        &self.reader.header
    }
}

impl FrameSource for SerSource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count_hint(&self) -> Option<usize> {
        Some(self.reader.frame_count())
    }

    fn into_frames(self: Box<Self>) -> Box<dyn Iterator<Item = Result<DecodedImage>> + Send> {
        let SerSource { reader, filter, .. } = *self;
        let count = reader.frame_count();
        Box::new((0..count).map(move |i| {
            let image = reader.read_frame(i)?;
            match &filter {
                Some(chain) => chain.apply(image),
                None => Ok(image),
            }
        }))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    // An empty recording may leave the dimensions unset.
    if frame_count > 0 && (width == 0 || height == 0) {
        return Err(SmushError::InvalidDimensions { width, height });
    }

    // Writers disagree on the flag; 0 is read as little-endian.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}
