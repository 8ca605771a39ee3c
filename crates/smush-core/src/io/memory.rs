use crate::error::Result;
use crate::frame::DecodedImage;
use crate::io::{check_sink_dimensions, FrameSink, FrameSource};

/// Frames held in memory, mostly for tests and synthetic input.
pub struct MemorySource {
    frames: Vec<Result<DecodedImage>>,
    frame_rate: f64,
}

impl MemorySource {
    pub fn new(frames: Vec<DecodedImage>, frame_rate: f64) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
            frame_rate,
        }
    }

    /// Source that yields the given results in order, errors included.
    pub fn from_results(frames: Vec<Result<DecodedImage>>, frame_rate: f64) -> Self {
        Self { frames, frame_rate }
    }
}

impl FrameSource for MemorySource {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn into_frames(self: Box<Self>) -> Box<dyn Iterator<Item = Result<DecodedImage>> + Send> {
        Box::new(self.frames.into_iter())
    }
}

/// Collects output frames in memory.
#[derive(Default)]
pub struct MemorySink {
    frames: Vec<DecodedImage>,
    dimensions: Option<(u32, u32)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[DecodedImage] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<DecodedImage> {
        self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for MemorySink {
    fn push(&mut self, image: DecodedImage) -> Result<()> {
        check_sink_dimensions(&mut self.dimensions, &image)?;
        self.frames.push(image);
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        self.finished = true;
        Ok(self.frames.len())
    }
}
