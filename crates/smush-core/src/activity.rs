//! Per-frame visual activity: fingerprints and consecutive-frame differences.

use rayon::prelude::*;

use crate::consts::{HUE_DEGREES, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{Result, SmushError};
use crate::frame::{DecodedImage, PixelLayout};

/// What the values of a [`Fingerprint`] measure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerprintKind {
    /// Hue in whole degrees, 0..=359. Circular.
    Hue,
    /// Raw luma, 0..=255. Linear.
    Luma,
}

/// Compact per-pixel scalar array used only for differencing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub kind: FingerprintKind,
    pub values: Vec<u16>,
}

impl Fingerprint {
    pub fn hue(values: Vec<u16>) -> Self {
        Self {
            kind: FingerprintKind::Hue,
            values,
        }
    }

    pub fn luma(values: Vec<u16>) -> Self {
        Self {
            kind: FingerprintKind::Luma,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Hue of an RGB triple in whole degrees (six-piece formula).
///
/// Gray, black and white pixels (max == min) have no hue and return 0.
pub fn hue(red: u8, green: u8, blue: u8) -> u16 {
    let (r, g, b) = (red as i32, green as i32, blue as i32);
    let min = r.min(g).min(b);
    let max = r.max(g).max(b);
    if min == max {
        return 0;
    }
    let span = (max - min) as f64;
    let sector = if max == r {
        (g - b) as f64 / span
    } else if max == g {
        2.0 + (b - r) as f64 / span
    } else {
        4.0 + (r - g) as f64 / span
    };
    let mut degrees = sector * 60.0;
    if degrees < 0.0 {
        degrees += HUE_DEGREES as f64;
    }
    (degrees as u16) % HUE_DEGREES
}

/// Fingerprint an image: hue for colour layouts, luma for gray images.
///
/// Hue ignores uniform lighting and shadow changes, so the score follows
/// content movement rather than exposure drift.
pub fn fingerprint(image: &DecodedImage) -> Fingerprint {
    let n = image.pixel_count();
    if image.layout() == PixelLayout::ByteGray {
        let values = (0..n).map(|i| image.luma(i) as u16).collect();
        return Fingerprint::luma(values);
    }
    let to_hue = |i: usize| {
        let [r, g, b] = image.rgb(i);
        hue(r, g, b)
    };
    let values = if n >= PARALLEL_PIXEL_THRESHOLD {
        (0..n).into_par_iter().map(to_hue).collect()
    } else {
        (0..n).map(to_hue).collect()
    };
    Fingerprint::hue(values)
}

/// Mean per-pixel distance between two fingerprints of the same kind and size.
///
/// Hue distances wrap around the colour wheel: 0° and 359° are 1° apart.
pub fn score(a: &Fingerprint, b: &Fingerprint) -> Result<f64> {
    if a.is_empty() || a.len() != b.len() {
        return Err(SmushError::InvalidInput(format!(
            "fingerprint sizes must match and be non-empty ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.kind != b.kind {
        return Err(SmushError::InvalidInput(format!(
            "cannot compare {:?} fingerprint with {:?}",
            a.kind, b.kind
        )));
    }
    let wrap = a.kind == FingerprintKind::Hue;
    let total: u64 = a
        .values
        .iter()
        .zip(&b.values)
        .map(|(&x, &y)| {
            let d = x.abs_diff(y);
            if wrap {
                d.min(HUE_DEGREES.saturating_sub(d)) as u64
            } else {
                d as u64
            }
        })
        .sum();
    Ok(total as f64 / a.len() as f64)
}

/// Activity scores for every consecutive pair of source frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityScores {
    pairs: Vec<f64>,
}

impl ActivityScores {
    pub fn new(pairs: Vec<f64>) -> Self {
        Self { pairs }
    }

    /// One score per frame pair (`frames - 1` values).
    pub fn pairs(&self) -> &[f64] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<f64> {
        self.pairs
    }

    /// Number of source frames the scores describe.
    pub fn frame_count(&self) -> usize {
        if self.pairs.is_empty() {
            0
        } else {
            self.pairs.len() + 1
        }
    }

    /// One score per source frame. Frame 0 has no predecessor and takes the
    /// score of the change into frame 1.
    pub fn per_frame(&self) -> Vec<f64> {
        match self.pairs.first() {
            Some(&first) => std::iter::once(first).chain(self.pairs.iter().copied()).collect(),
            None => Vec::new(),
        }
    }

    pub fn mean(&self) -> f64 {
        if self.pairs.is_empty() {
            return 0.0;
        }
        self.pairs.iter().sum::<f64>() / self.pairs.len() as f64
    }

    pub fn max(&self) -> f64 {
        self.pairs.iter().copied().fold(0.0, f64::max)
    }
}

/// Score a finite frame sequence pairwise, holding at most two fingerprints.
pub fn score_frames<I>(frames: I) -> Result<ActivityScores>
where
    I: IntoIterator<Item = Result<DecodedImage>>,
{
    score_fingerprints(frames.into_iter().map(|f| f.map(|img| fingerprint(&img))))
}

/// Pairwise scores over a stream of already computed fingerprints.
pub fn score_fingerprints<I>(fingerprints: I) -> Result<ActivityScores>
where
    I: IntoIterator<Item = Result<Fingerprint>>,
{
    let mut pairs = Vec::new();
    let mut previous: Option<Fingerprint> = None;
    for fp in fingerprints {
        let fp = fp?;
        if let Some(prev) = previous.as_ref() {
            pairs.push(score(prev, &fp)?);
        }
        previous = Some(fp);
    }
    Ok(ActivityScores::new(pairs))
}
