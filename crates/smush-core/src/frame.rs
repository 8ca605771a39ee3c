use image::{GrayImage, RgbImage};

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::error::{Result, SmushError};

/// In-memory pixel layout of a decoded image.
///
/// Packed layouts store one `u32` per pixel, byte layouts store interleaved
/// channel bytes. Alpha, when present, is carried but never summed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelLayout {
    /// `0x00RRGGBB`
    IntRgb,
    /// `0xAARRGGBB`
    IntArgb,
    /// `0x00BBGGRR`
    IntBgr,
    /// B, G, R bytes
    ThreeByteBgr,
    /// A, B, G, R bytes
    FourByteAbgr,
    /// One luma byte per pixel
    ByteGray,
}

impl PixelLayout {
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::IntRgb | Self::IntArgb | Self::IntBgr)
    }

    /// Bytes per pixel for byte layouts, `None` for packed layouts.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::ThreeByteBgr => Some(3),
            Self::FourByteAbgr => Some(4),
            Self::ByteGray => Some(1),
            _ => None,
        }
    }

    /// How to pull red, green and blue out of one pixel, or `None` for layouts
    /// without colour channels.
    pub fn channel_access(&self) -> Option<ChannelAccess> {
        match self {
            Self::IntRgb | Self::IntArgb => Some(ChannelAccess::Packed {
                red_shift: 16,
                green_shift: 8,
                blue_shift: 0,
            }),
            Self::IntBgr => Some(ChannelAccess::Packed {
                red_shift: 0,
                green_shift: 8,
                blue_shift: 16,
            }),
            Self::ThreeByteBgr => Some(ChannelAccess::Bytes {
                step: 3,
                red: 2,
                green: 1,
                blue: 0,
            }),
            Self::FourByteAbgr => Some(ChannelAccess::Bytes {
                step: 4,
                red: 3,
                green: 2,
                blue: 1,
            }),
            Self::ByteGray => None,
        }
    }
}

impl std::fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IntRgb => write!(f, "int RGB"),
            Self::IntArgb => write!(f, "int ARGB"),
            Self::IntBgr => write!(f, "int BGR"),
            Self::ThreeByteBgr => write!(f, "3-byte BGR"),
            Self::FourByteAbgr => write!(f, "4-byte ABGR"),
            Self::ByteGray => write!(f, "byte gray"),
        }
    }
}

/// Channel extraction recipe derived from a [`PixelLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelAccess {
    Packed {
        red_shift: u32,
        green_shift: u32,
        blue_shift: u32,
    },
    Bytes {
        step: usize,
        red: usize,
        green: usize,
        blue: usize,
    },
}

/// Raw pixel storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PixelData {
    Packed(Vec<u32>),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    pub frame_index: usize,
    pub timestamp_us: Option<u64>,
}

/// A single decoded video frame with 8-bit channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: PixelData,
    pub metadata: FrameMetadata,
}

impl DecodedImage {
    /// Wrap a pixel buffer, checking that its size and kind match the layout.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: PixelData) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SmushError::InvalidDimensions { width, height });
        }
        let pixels = width as usize * height as usize;
        let len_ok = match (&data, layout.bytes_per_pixel()) {
            (PixelData::Packed(words), None) => words.len() == pixels,
            (PixelData::Bytes(bytes), Some(bpp)) => bytes.len() == pixels * bpp,
            _ => {
                return Err(SmushError::InvalidInput(format!(
                    "pixel buffer kind does not match declared layout {layout}"
                )))
            }
        };
        if !len_ok {
            return Err(SmushError::InvalidInput(format!(
                "pixel buffer length does not match {width}x{height} {layout}"
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
            metadata: FrameMetadata::default(),
        })
    }

    /// Build a packed `IntRgb` image from a per-pixel function of `(x, y)`.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Result<Self> {
        let mut words = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                words.push(pack_rgb(f(x, y)));
            }
        }
        Self::new(width, height, PixelLayout::IntRgb, PixelData::Packed(words))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Red, green and blue of pixel `index` (row-major). Gray pixels repeat luma.
    pub fn rgb(&self, index: usize) -> [u8; 3] {
        match (self.layout.channel_access(), &self.data) {
            (
                Some(ChannelAccess::Packed {
                    red_shift,
                    green_shift,
                    blue_shift,
                }),
                PixelData::Packed(words),
            ) => {
                let w = words[index];
                [
                    (w >> red_shift) as u8,
                    (w >> green_shift) as u8,
                    (w >> blue_shift) as u8,
                ]
            }
            (
                Some(ChannelAccess::Bytes {
                    step,
                    red,
                    green,
                    blue,
                }),
                PixelData::Bytes(bytes),
            ) => {
                let base = index * step;
                [bytes[base + red], bytes[base + green], bytes[base + blue]]
            }
            (_, PixelData::Bytes(bytes)) => {
                let v = bytes[index];
                [v, v, v]
            }
            (_, PixelData::Packed(_)) => unreachable!("packed data always has channel access"),
        }
    }

    /// Convert to an `image` crate RGB buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut buf = Vec::with_capacity(self.pixel_count() * 3);
        for i in 0..self.pixel_count() {
            buf.extend_from_slice(&self.rgb(i));
        }
        RgbImage::from_raw(self.width, self.height, buf).expect("buffer size matches dimensions")
    }

    /// Wrap an `image` crate RGB buffer as interleaved BGR bytes.
    pub fn from_rgb_image(img: &RgbImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        let mut bytes = Vec::with_capacity(w as usize * h as usize * 3);
        for px in img.pixels() {
            bytes.extend_from_slice(&[px.0[2], px.0[1], px.0[0]]);
        }
        Self::new(w, h, PixelLayout::ThreeByteBgr, PixelData::Bytes(bytes))
    }

    /// Convert a `ByteGray` image to an `image` crate gray buffer.
    pub fn to_gray_image(&self) -> GrayImage {
        let luma: Vec<u8> = (0..self.pixel_count()).map(|i| self.luma(i)).collect();
        GrayImage::from_raw(self.width, self.height, luma).expect("buffer size matches dimensions")
    }

    pub fn from_gray_image(img: &GrayImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelLayout::ByteGray, PixelData::Bytes(img.as_raw().clone()))
    }

    /// ITU-R BT.601 luma of pixel `index`; gray images return the stored byte.
    pub fn luma(&self, index: usize) -> u8 {
        if let (PixelLayout::ByteGray, PixelData::Bytes(bytes)) = (self.layout, &self.data) {
            return bytes[index];
        }
        let [r, g, b] = self.rgb(index);
        (r as f32 * LUMINANCE_R + g as f32 * LUMINANCE_G + b as f32 * LUMINANCE_B)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    /// Re-encode into another layout. Alpha is written as opaque.
    pub fn convert(&self, layout: PixelLayout) -> Result<Self> {
        if layout == self.layout {
            return Ok(self.clone());
        }
        let n = self.pixel_count();
        let data = match layout {
            PixelLayout::ByteGray => PixelData::Bytes((0..n).map(|i| self.luma(i)).collect()),
            PixelLayout::IntRgb | PixelLayout::IntArgb | PixelLayout::IntBgr => {
                let alpha = if layout == PixelLayout::IntArgb { 0xFF00_0000 } else { 0 };
                PixelData::Packed(
                    (0..n)
                        .map(|i| {
                            let [r, g, b] = self.rgb(i);
                            let w = if layout == PixelLayout::IntBgr {
                                pack_rgb([b, g, r])
                            } else {
                                pack_rgb([r, g, b])
                            };
                            w | alpha
                        })
                        .collect(),
                )
            }
            PixelLayout::ThreeByteBgr | PixelLayout::FourByteAbgr => {
                let with_alpha = layout == PixelLayout::FourByteAbgr;
                let mut bytes = Vec::with_capacity(n * if with_alpha { 4 } else { 3 });
                for i in 0..n {
                    let [r, g, b] = self.rgb(i);
                    if with_alpha {
                        bytes.push(0xFF);
                    }
                    bytes.extend_from_slice(&[b, g, r]);
                }
                PixelData::Bytes(bytes)
            }
        };
        let mut out = Self::new(self.width, self.height, layout, data)?;
        out.metadata = self.metadata.clone();
        Ok(out)
    }
}

/// Pack an `[r, g, b]` triple as `0x00RRGGBB`.
pub fn pack_rgb([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}
