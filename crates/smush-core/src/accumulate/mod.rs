//! Frame accumulators: sum many equally sized images, then emit their average.

pub mod array;
pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::CHANNEL_MAX;
use crate::error::{Result, SmushError};
use crate::frame::{ChannelAccess, DecodedImage, PixelData};

/// Sums full-resolution frames per channel and averages them on demand.
///
/// An accumulator is created blank for one `(width, height)` and reused for
/// a whole run: `to_average_and_reset` emits the mean and zeroes the sums.
/// Mutation goes through `&mut self`, so one owner drives it at a time.
pub trait FrameAccumulator: Send {
    fn name(&self) -> &str;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Frames summed since the last reset.
    fn frames_added(&self) -> u32;

    /// Add one frame. On error the sums are left as they were.
    fn add(&mut self, image: &DecodedImage) -> Result<()>;

    /// Average of everything added since the last reset, as `IntRgb`.
    fn to_average_and_reset(&mut self) -> Result<DecodedImage>;

    /// Release backend resources. The accumulator must not be used afterwards.
    fn close(&mut self) {}
}

/// Which accumulator backend to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulatorKind {
    /// Integer planes on the CPU, channels summed in parallel.
    #[default]
    Cpu,
    /// wgpu compute kernel (requires the `gpu` feature).
    Gpu,
    /// ndarray float accumulate-then-convert.
    Array,
}

impl fmt::Display for AccumulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Gpu => write!(f, "GPU"),
            Self::Array => write!(f, "Array"),
        }
    }
}

/// Build a blank accumulator for `width x height` frames.
pub fn create_accumulator(
    kind: AccumulatorKind,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameAccumulator>> {
    match kind {
        AccumulatorKind::Cpu => Ok(Box::new(cpu::CpuAccumulator::new(width, height)?)),
        AccumulatorKind::Array => Ok(Box::new(array::ArrayAccumulator::new(width, height)?)),
        #[cfg(feature = "gpu")]
        AccumulatorKind::Gpu => Ok(Box::new(gpu::GpuAccumulator::new(width, height)?)),
        #[cfg(not(feature = "gpu"))]
        AccumulatorKind::Gpu => Err(SmushError::GpuError(
            "built without the `gpu` feature".into(),
        )),
    }
}

/// Most frames a `u32` channel sum can hold without overflow.
pub const fn frame_limit() -> u32 {
    u32::MAX / CHANNEL_MAX
}

/// Fail with `Overflow` if one more frame could overflow a channel sum.
pub(crate) fn check_capacity(frames_added: u32) -> Result<()> {
    if frames_added >= frame_limit() {
        return Err(SmushError::Overflow {
            frames_added,
            limit: frame_limit(),
        });
    }
    Ok(())
}

pub(crate) fn check_dimensions(expected: (u32, u32), image: &DecodedImage) -> Result<()> {
    if (image.width(), image.height()) != expected {
        return Err(SmushError::InvalidInput(format!(
            "frame is {}x{}, accumulator expects {}x{}",
            image.width(),
            image.height(),
            expected.0,
            expected.1
        )));
    }
    Ok(())
}

pub(crate) fn blank_dimensions(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(SmushError::InvalidDimensions { width, height });
    }
    Ok(width as usize * height as usize)
}

/// Per-channel sample reader for one image, resolved from its layout.
///
/// Gray frames have no colour channels to sum and are rejected.
pub(crate) enum Channels<'a> {
    Packed { words: &'a [u32], shifts: [u32; 3] },
    Bytes { bytes: &'a [u8], step: usize, offsets: [usize; 3] },
}

impl<'a> Channels<'a> {
    pub(crate) fn of(image: &'a DecodedImage) -> Result<Self> {
        let access = image.layout().channel_access().ok_or_else(|| {
            SmushError::UnsupportedPixelLayout(format!(
                "{} frames cannot be accumulated, convert to a colour layout first",
                image.layout()
            ))
        })?;
        match (access, image.data()) {
            (
                ChannelAccess::Packed {
                    red_shift,
                    green_shift,
                    blue_shift,
                },
                PixelData::Packed(words),
            ) => Ok(Self::Packed {
                words,
                shifts: [red_shift, green_shift, blue_shift],
            }),
            (
                ChannelAccess::Bytes {
                    step,
                    red,
                    green,
                    blue,
                },
                PixelData::Bytes(bytes),
            ) => Ok(Self::Bytes {
                bytes,
                step,
                offsets: [red, green, blue],
            }),
            _ => Err(SmushError::InvalidInput(format!(
                "pixel buffer kind does not match layout {}",
                image.layout()
            ))),
        }
    }

    /// Sample of channel `c` (0 = red, 1 = green, 2 = blue) at pixel `i`.
    #[inline]
    pub(crate) fn sample(&self, c: usize, i: usize) -> u8 {
        match self {
            Self::Packed { words, shifts } => (words[i] >> shifts[c]) as u8,
            Self::Bytes {
                bytes,
                step,
                offsets,
            } => bytes[i * step + offsets[c]],
        }
    }
}
