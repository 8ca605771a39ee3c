use ndarray::{Array3, Axis};

use crate::error::{Result, SmushError};
use crate::frame::{pack_rgb, DecodedImage, PixelData, PixelLayout};

use super::{blank_dimensions, check_capacity, check_dimensions, Channels, FrameAccumulator};

/// Float accumulate-then-convert backend on an `(height, width, 3)` array.
///
/// Sums stay exact while `frames * 255 < 2^24`; past that the low bits of
/// the average may drift by one.
pub struct ArrayAccumulator {
    sum: Array3<f32>,
    frames_added: u32,
}

impl ArrayAccumulator {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        blank_dimensions(width, height)?;
        Ok(Self {
            sum: Array3::zeros((height as usize, width as usize, 3)),
            frames_added: 0,
        })
    }
}

impl FrameAccumulator for ArrayAccumulator {
    fn name(&self) -> &str {
        "Array"
    }

    fn width(&self) -> u32 {
        self.sum.len_of(Axis(1)) as u32
    }

    fn height(&self) -> u32 {
        self.sum.len_of(Axis(0)) as u32
    }

    fn frames_added(&self) -> u32 {
        self.frames_added
    }

    fn add(&mut self, image: &DecodedImage) -> Result<()> {
        check_dimensions((self.width(), self.height()), image)?;
        let channels = Channels::of(image)?;
        check_capacity(self.frames_added)?;

        let w = self.width() as usize;
        let frame = Array3::from_shape_fn(self.sum.dim(), |(y, x, c)| {
            channels.sample(c, y * w + x) as f32
        });
        self.sum += &frame;
        self.frames_added += 1;
        Ok(())
    }

    fn to_average_and_reset(&mut self) -> Result<DecodedImage> {
        if self.frames_added == 0 {
            return Err(SmushError::EmptySequence);
        }
        let n = self.frames_added as f32;
        let mean = self.sum.mapv(|v| (v / n).trunc().clamp(0.0, 255.0) as u8);

        let words: Vec<u32> = mean
            .lanes(Axis(2))
            .into_iter()
            .map(|px| pack_rgb([px[0], px[1], px[2]]))
            .collect();

        self.sum.fill(0.0);
        self.frames_added = 0;

        DecodedImage::new(
            self.width(),
            self.height(),
            PixelLayout::IntRgb,
            PixelData::Packed(words),
        )
    }

    fn close(&mut self) {
        self.sum = Array3::zeros((0, 0, 3));
        self.frames_added = 0;
    }
}
