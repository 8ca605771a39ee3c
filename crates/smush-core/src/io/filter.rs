//! Declarative per-frame transforms, e.g. `crop=in_w*.5:in_h*.5:in_w*.25:in_h*.25,scale=32:32`.

use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::{Result, SmushError};
use crate::frame::{DecodedImage, PixelLayout};

/// Size term of a crop: a pixel count or a fraction of the input size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    Pixels(u32),
    InputWidth(f64),
    InputHeight(f64),
}

impl Extent {
    fn resolve(&self, in_w: u32, in_h: u32) -> u32 {
        match *self {
            Self::Pixels(px) => px,
            Self::InputWidth(f) => (in_w as f64 * f).floor().max(0.0) as u32,
            Self::InputHeight(f) => (in_h as f64 * f).floor().max(0.0) as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr24,
    Gray,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterStep {
    Crop {
        width: Extent,
        height: Extent,
        x: Extent,
        y: Extent,
    },
    /// `None` keeps the aspect ratio for that side.
    Scale {
        width: Option<u32>,
        height: Option<u32>,
    },
    Transpose(Rotation),
    Format(PixelFormat),
}

/// Ordered list of filter steps applied to every frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain {
    steps: Vec<FilterStep>,
}

impl FilterChain {
    pub fn parse(text: &str) -> Result<Self> {
        let steps = text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_step)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append `step` and return the chain.
    pub fn then(mut self, step: FilterStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn apply(&self, image: DecodedImage) -> Result<DecodedImage> {
        let metadata = image.metadata.clone();
        let mut current = image;
        for step in &self.steps {
            current = apply_step(step, current)?;
        }
        current.metadata = metadata;
        Ok(current)
    }
}

impl FromStr for FilterChain {
    type Err = SmushError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixels(px) => write!(f, "{px}"),
            Self::InputWidth(factor) => write!(f, "in_w*{factor}"),
            Self::InputHeight(factor) => write!(f, "in_h*{factor}"),
        }
    }
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: &Option<u32>| v.map_or_else(|| "-1".to_string(), |v| v.to_string());
        match self {
            Self::Crop {
                width,
                height,
                x,
                y,
            } => write!(f, "crop={width}:{height}:{x}:{y}"),
            Self::Scale { width, height } => write!(f, "scale={}:{}", side(width), side(height)),
            Self::Transpose(Rotation::Clockwise) => write!(f, "transpose=1"),
            Self::Transpose(Rotation::CounterClockwise) => write!(f, "transpose=2"),
            Self::Format(PixelFormat::Bgr24) => write!(f, "format=bgr24"),
            Self::Format(PixelFormat::Gray) => write!(f, "format=gray"),
        }
    }
}

fn parse_step(text: &str) -> Result<FilterStep> {
    let (name, args) = text
        .split_once('=')
        .ok_or_else(|| SmushError::InvalidFilter(format!("`{text}` is missing `=`")))?;
    let args: Vec<&str> = args.split(':').map(str::trim).collect();
    match (name.trim(), args.as_slice()) {
        ("crop", [w, h, x, y]) => Ok(FilterStep::Crop {
            width: parse_extent(w)?,
            height: parse_extent(h)?,
            x: parse_extent(x)?,
            y: parse_extent(y)?,
        }),
        ("scale", [w, h]) => {
            let width = parse_scale_side(w)?;
            let height = parse_scale_side(h)?;
            if width.is_none() && height.is_none() {
                return Err(SmushError::InvalidFilter(
                    "scale needs at least one fixed side".into(),
                ));
            }
            Ok(FilterStep::Scale { width, height })
        }
        ("transpose", ["1"]) => Ok(FilterStep::Transpose(Rotation::Clockwise)),
        ("transpose", ["2"]) => Ok(FilterStep::Transpose(Rotation::CounterClockwise)),
        ("format", ["bgr24"]) => Ok(FilterStep::Format(PixelFormat::Bgr24)),
        ("format", ["gray"]) => Ok(FilterStep::Format(PixelFormat::Gray)),
        (name, _) => Err(SmushError::InvalidFilter(format!(
            "unsupported filter `{name}` with arguments `{}`",
            args.join(":")
        ))),
    }
}

fn parse_extent(text: &str) -> Result<Extent> {
    let bad = || SmushError::InvalidFilter(format!("bad size term `{text}`"));
    let scaled = |factor: &str, ctor: fn(f64) -> Extent| -> Result<Extent> {
        let f = if factor.is_empty() {
            1.0
        } else if let Some(num) = factor.strip_prefix('*') {
            num.parse::<f64>().map_err(|_| bad())?
        } else if let Some(den) = factor.strip_prefix('/') {
            let d = den.parse::<f64>().map_err(|_| bad())?;
            if d == 0.0 {
                return Err(bad());
            }
            1.0 / d
        } else {
            return Err(bad());
        };
        if !f.is_finite() || f < 0.0 {
            return Err(bad());
        }
        Ok(ctor(f))
    };
    if let Some(rest) = text.strip_prefix("in_w") {
        scaled(rest, Extent::InputWidth)
    } else if let Some(rest) = text.strip_prefix("in_h") {
        scaled(rest, Extent::InputHeight)
    } else {
        text.parse::<u32>().map(Extent::Pixels).map_err(|_| bad())
    }
}

fn parse_scale_side(text: &str) -> Result<Option<u32>> {
    match text {
        "-1" => Ok(None),
        _ => match text.parse::<u32>() {
            Ok(0) | Err(_) => Err(SmushError::InvalidFilter(format!("bad scale size `{text}`"))),
            Ok(v) => Ok(Some(v)),
        },
    }
}

fn to_dynamic(image: &DecodedImage) -> DynamicImage {
    match image.layout() {
        PixelLayout::ByteGray => DynamicImage::ImageLuma8(image.to_gray_image()),
        _ => DynamicImage::ImageRgb8(image.to_rgb_image()),
    }
}

fn from_dynamic(img: &DynamicImage, gray: bool) -> Result<DecodedImage> {
    if gray {
        DecodedImage::from_gray_image(&img.to_luma8())
    } else {
        DecodedImage::from_rgb_image(&img.to_rgb8())
    }
}

fn apply_step(step: &FilterStep, image: DecodedImage) -> Result<DecodedImage> {
    let gray = image.layout() == PixelLayout::ByteGray;
    let (in_w, in_h) = (image.width(), image.height());
    match step {
        FilterStep::Crop {
            width,
            height,
            x,
            y,
        } => {
            let (w, h) = (width.resolve(in_w, in_h), height.resolve(in_w, in_h));
            let (x, y) = (x.resolve(in_w, in_h), y.resolve(in_w, in_h));
            if w == 0 || h == 0 || x.saturating_add(w) > in_w || y.saturating_add(h) > in_h {
                return Err(SmushError::InvalidFilter(format!(
                    "crop {w}x{h}+{x}+{y} does not fit a {in_w}x{in_h} frame"
                )));
            }
            from_dynamic(&to_dynamic(&image).crop_imm(x, y, w, h), gray)
        }
        FilterStep::Scale { width, height } => {
            let aspect = |side: u32, num: u32, den: u32| {
                ((side as f64 * num as f64 / den as f64).round() as u32).max(1)
            };
            let (w, h) = match (*width, *height) {
                (Some(w), Some(h)) => (w, h),
                (Some(w), None) => (w, aspect(w, in_h, in_w)),
                (None, Some(h)) => (aspect(h, in_w, in_h), h),
                (None, None) => (in_w, in_h),
            };
            if (w, h) == (in_w, in_h) {
                return Ok(image);
            }
            from_dynamic(
                &to_dynamic(&image).resize_exact(w, h, FilterType::Triangle),
                gray,
            )
        }
        FilterStep::Transpose(rotation) => {
            let img = to_dynamic(&image);
            let rotated = match rotation {
                Rotation::Clockwise => img.rotate90(),
                Rotation::CounterClockwise => img.rotate270(),
            };
            from_dynamic(&rotated, gray)
        }
        FilterStep::Format(PixelFormat::Bgr24) => image.convert(PixelLayout::ThreeByteBgr),
        FilterStep::Format(PixelFormat::Gray) => image.convert(PixelLayout::ByteGray),
    }
}
