use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::debug;

use crate::error::Result;
use crate::frame::{DecodedImage, PixelLayout};
use crate::io::{check_sink_dimensions, FrameSink};

/// Save an image as 8-bit PNG: gray frames as grayscale, everything else as RGB.
pub fn save_png(image: &DecodedImage, path: &Path) -> Result<()> {
    if image.layout() == PixelLayout::ByteGray {
        image.to_gray_image().save_with_format(path, ImageFormat::Png)?;
    } else {
        image.to_rgb_image().save_with_format(path, ImageFormat::Png)?;
    }
    Ok(())
}

/// Load any image file the `image` crate can decode, as `ThreeByteBgr`.
pub fn load_image(path: &Path) -> Result<DecodedImage> {
    let img = image::open(path)?;
    DecodedImage::from_rgb_image(&img.to_rgb8())
}

/// Numbered PNG files (`frame_000000.png`, ...) in one directory.
pub struct PngSequenceSink {
    dir: PathBuf,
    dimensions: Option<(u32, u32)>,
    written: usize,
}

impl PngSequenceSink {
    /// Create (or reuse) `dir` as the output directory.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            dimensions: None,
            written: 0,
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for PngSequenceSink {
    fn push(&mut self, image: DecodedImage) -> Result<()> {
        check_sink_dimensions(&mut self.dimensions, &image)?;
        save_png(&image, &self.frame_path(self.written))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        debug!(dir = %self.dir.display(), frames = self.written, "PNG sequence finished");
        Ok(self.written)
    }
}
