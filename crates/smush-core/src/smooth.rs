use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_MAX_MERGE, DEFAULT_MIN_MERGE, DEFAULT_POLYNOMIAL_DEGREE, DEFAULT_SMOOTHING_WINDOW,
    DEFAULT_VARIABILITY_EXPONENT,
};
use crate::error::{Result, SmushError};

/// Savitzky-Golay smoothing: a local least-squares polynomial fit per point.
///
/// Keeps the height and width of sustained activity bursts, where a moving
/// average would blunt them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavitzkyGolay {
    /// Window length in points. Even values behave like the next odd length.
    pub window: usize,
    /// Degree of the fitted polynomial (default: quadratic).
    pub degree: usize,
}

impl Default for SavitzkyGolay {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
            degree: DEFAULT_POLYNOMIAL_DEGREE,
        }
    }
}

impl SavitzkyGolay {
    pub fn new(window: usize, degree: usize) -> Result<Self> {
        if window == 0 {
            return Err(SmushError::InvalidInput(
                "smoothing window must be at least 1".into(),
            ));
        }
        Ok(Self { window, degree })
    }

    /// Smooth `data`. Output has the same length; input shorter than the
    /// window is returned unchanged.
    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        if n < self.window.max(1) {
            return data.to_vec();
        }
        let half = self.window / 2;

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half).min(n - 1);
                fit_at(&data[start..=end], start, i, self.degree).unwrap_or(data[i])
            })
            .collect()
    }
}

/// Fit a polynomial of `degree` to `window` (whose first point sits at index
/// `start`) and evaluate it at `at`. `None` if the window is too short or the
/// system is singular.
fn fit_at(window: &[f64], start: usize, at: usize, degree: usize) -> Option<f64> {
    let terms = degree + 1;
    if window.len() < terms {
        return None;
    }

    // Center x on the evaluation point so the answer is the constant term.
    let mut normal = Array2::<f64>::zeros((terms, terms));
    let mut rhs = Array1::<f64>::zeros(terms);
    for (j, &y) in window.iter().enumerate() {
        let x = (start + j) as f64 - at as f64;
        let mut powers = vec![1.0f64; 2 * terms - 1];
        for k in 1..powers.len() {
            powers[k] = powers[k - 1] * x;
        }
        for p in 0..terms {
            rhs[p] += powers[p] * y;
            for q in 0..terms {
                normal[[p, q]] += powers[p + q];
            }
        }
    }

    let coeffs = solve_linear(normal, rhs)?;
    Some(coeffs[0])
}

/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| a[[r1, col]].abs().total_cmp(&a[[r2, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[[row, k]] * x[k];
        }
        x[row] = acc / a[[row, row]];
    }
    Some(x)
}

/// Power-curve reshaping of a smoothed activity series into a merge range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariabilityConfig {
    /// Values above 1 make quiet stretches quieter and busy stretches dominant.
    pub exponent: f64,
    /// Lower bound of the output range; at least 1 (never slower than 1x).
    pub min_merge: u32,
    /// Upper bound of the output range.
    pub max_merge: u32,
}

impl Default for VariabilityConfig {
    fn default() -> Self {
        Self {
            exponent: DEFAULT_VARIABILITY_EXPONENT,
            min_merge: DEFAULT_MIN_MERGE,
            max_merge: DEFAULT_MAX_MERGE,
        }
    }
}

impl VariabilityConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.exponent.is_finite() || self.exponent <= 0.0 {
            return Err(SmushError::InvalidInput(format!(
                "variability exponent must be positive, got {}",
                self.exponent
            )));
        }
        if self.min_merge < 1 || self.max_merge < self.min_merge {
            return Err(SmushError::InvalidInput(format!(
                "merge range must satisfy 1 <= min <= max, got {}..={}",
                self.min_merge, self.max_merge
            )));
        }
        Ok(())
    }
}

/// Normalize `data` to [0, 1], raise to `exponent`, and rescale linearly into
/// `[min_merge, max_merge]`. A flat series maps to `min_merge` throughout.
pub fn enhance_variability(data: &[f64], config: &VariabilityConfig) -> Result<Vec<u32>> {
    config.validate()?;
    if data.iter().any(|v| !v.is_finite()) {
        return Err(SmushError::InvalidInput(
            "activity series contains non-finite values".into(),
        ));
    }

    let shaped: Vec<f64> = normalize(data)
        .into_iter()
        .map(|v| v.powf(config.exponent))
        .collect();

    let lo = config.min_merge as f64;
    let hi = config.max_merge as f64;
    Ok(normalize(&shaped)
        .into_iter()
        .map(|v| (lo + v * (hi - lo)).round().clamp(lo, hi) as u32)
        .collect())
}

/// Rescale so the smallest value is 0.0 and the largest 1.0.
pub fn normalize(data: &[f64]) -> Vec<f64> {
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; data.len()];
    }
    data.iter().map(|&v| (v - min) / range).collect()
}
