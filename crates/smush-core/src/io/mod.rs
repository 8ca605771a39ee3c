pub mod filter;
pub mod image_io;
pub mod memory;
pub mod score_cache;
pub mod ser;
pub mod ser_writer;

use std::path::Path;

use crate::error::Result;
use crate::frame::DecodedImage;

/// Lazy, finite, forward-only sequence of decoded frames.
///
/// A source is consumed by `into_frames`; iterating twice means opening the
/// input again.
pub trait FrameSource {
    /// Native frame rate of the input.
    fn frame_rate(&self) -> f64;

    /// Number of frames, when the container records it.
    fn frame_count_hint(&self) -> Option<usize> {
        None
    }

    fn into_frames(self: Box<Self>) -> Box<dyn Iterator<Item = Result<DecodedImage>> + Send>;
}

/// Consumer of output frames. The first frame fixes the output dimensions.
pub trait FrameSink: Send {
    fn push(&mut self, image: DecodedImage) -> Result<()>;

    /// Flush everything written so far and return the number of frames.
    fn finish(&mut self) -> Result<usize>;
}

/// Pick an output sink from the path: `.ser` files get a SER writer,
/// anything else is treated as a directory for numbered PNGs.
pub fn create_sink(path: &Path, fps: f64) -> Result<Box<dyn FrameSink>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ser" | "SER") => Ok(Box::new(ser_writer::SerSink::create(path, fps)?)),
        _ => Ok(Box::new(image_io::PngSequenceSink::create(path)?)),
    }
}

/// Shared first-frame dimension check for sinks.
pub(crate) fn check_sink_dimensions(
    fixed: &mut Option<(u32, u32)>,
    image: &DecodedImage,
) -> Result<()> {
    let dims = (image.width(), image.height());
    match *fixed {
        None => {
            *fixed = Some(dims);
            Ok(())
        }
        Some(expected) if expected == dims => Ok(()),
        Some((w, h)) => Err(crate::error::SmushError::InvalidInput(format!(
            "output frame is {}x{}, sink was opened at {w}x{h}",
            dims.0, dims.1
        ))),
    }
}
