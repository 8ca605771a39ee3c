use rayon::prelude::*;
use tracing::trace;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, SmushError};
use crate::frame::{pack_rgb, DecodedImage, PixelData, PixelLayout};

use super::{blank_dimensions, check_capacity, check_dimensions, Channels, FrameAccumulator};

/// Reference backend: one `u32` sum plane per colour channel.
pub struct CpuAccumulator {
    width: u32,
    height: u32,
    planes: [Vec<u32>; 3],
    frames_added: u32,
}

impl CpuAccumulator {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let n = blank_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            planes: [vec![0; n], vec![0; n], vec![0; n]],
            frames_added: 0,
        })
    }

    fn pixel_count(&self) -> usize {
        self.planes[0].len()
    }
}

fn add_plane(plane: &mut [u32], channels: &Channels<'_>, c: usize) {
    plane
        .iter_mut()
        .enumerate()
        .for_each(|(i, sum)| *sum += channels.sample(c, i) as u32);
}

impl FrameAccumulator for CpuAccumulator {
    fn name(&self) -> &str {
        "CPU"
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frames_added(&self) -> u32 {
        self.frames_added
    }

    fn add(&mut self, image: &DecodedImage) -> Result<()> {
        check_dimensions((self.width, self.height), image)?;
        let channels = Channels::of(image)?;
        check_capacity(self.frames_added)?;

        let parallel = self.pixel_count() >= PARALLEL_PIXEL_THRESHOLD;
        let [red, green, blue] = &mut self.planes;
        if parallel {
            rayon::join(
                || add_plane(red, &channels, 0),
                || {
                    rayon::join(
                        || add_plane(green, &channels, 1),
                        || add_plane(blue, &channels, 2),
                    )
                },
            );
        } else {
            add_plane(red, &channels, 0);
            add_plane(green, &channels, 1);
            add_plane(blue, &channels, 2);
        }

        self.frames_added += 1;
        trace!(frames = self.frames_added, "CPU accumulate");
        Ok(())
    }

    fn to_average_and_reset(&mut self) -> Result<DecodedImage> {
        if self.frames_added == 0 {
            return Err(SmushError::EmptySequence);
        }
        let n = self.frames_added;
        let [red, green, blue] = &self.planes;
        let average = |i: usize| {
            pack_rgb([
                (red[i] / n) as u8,
                (green[i] / n) as u8,
                (blue[i] / n) as u8,
            ])
        };
        let words: Vec<u32> = if self.pixel_count() >= PARALLEL_PIXEL_THRESHOLD {
            (0..self.pixel_count()).into_par_iter().map(average).collect()
        } else {
            (0..self.pixel_count()).map(average).collect()
        };

        for plane in &mut self.planes {
            plane.fill(0);
        }
        self.frames_added = 0;

        DecodedImage::new(
            self.width,
            self.height,
            PixelLayout::IntRgb,
            PixelData::Packed(words),
        )
    }

    fn close(&mut self) {
        self.planes = [Vec::new(), Vec::new(), Vec::new()];
        self.frames_added = 0;
    }
}
