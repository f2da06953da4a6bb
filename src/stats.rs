//! Descriptive statistics over simulation batches.
//!
//! Every function returns `None` for empty input or non-finite values
//! instead of propagating NaN into a summary table.
//!
//! # Algorithms
//!
//! - **Mean**: Kahan compensated summation.
//! - **Variance/StdDev**: Welford's online algorithm, sample (n − 1) form.
//!   Reference: Welford (1962), *Technometrics* 4(3).
//! - **Quantile**: R-7 linear interpolation, the NumPy/pandas default.
//!   Reference: Hyndman & Fan (1996), *The American Statistician* 50(4).

use serde::{Deserialize, Serialize};

/// Kahan compensated sum.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut c = 0.0;
    for &x in data {
        let y = x - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Arithmetic mean using Kahan summation.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
///
/// # Examples
/// ```
/// use smpsite::stats::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || data.iter().any(|x| !x.is_finite()) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Mean of squares, `Σx² / n`.
pub fn mean_square(data: &[f64]) -> Option<f64> {
    let squares: Vec<f64> = data.iter().map(|x| x * x).collect();
    mean(&squares)
}

/// Sample variance (Bessel-corrected) via Welford's algorithm.
///
/// # Returns
/// - `None` if `data.len() < 2` or data contains NaN/Inf.
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || data.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in data.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }
    Some(m2 / (data.len() - 1) as f64)
}

/// Sample standard deviation, `√variance`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// `p`-th quantile of **sorted** data, R-7 method:
/// `h = (n − 1)p`, result `x[⌊h⌋] + (h − ⌊h⌋)(x[⌊h⌋+1] − x[⌊h⌋])`.
///
/// # Returns
/// - `None` if `sorted` is empty or `p` is outside `[0, 1]`.
///
/// # Examples
/// ```
/// use smpsite::stats::quantile_sorted;
/// let data = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(quantile_sorted(&data, 0.5), Some(2.5));
/// assert_eq!(quantile_sorted(&data, 1.0), Some(4.0));
/// ```
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();
    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some(sorted[j] + g * (sorted[j + 1] - sorted[j]))
    }
}

/// Sorted copy of `data`, or `None` if it contains NaN.
fn sorted_copy(data: &[f64]) -> Option<Vec<f64>> {
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).expect("NaN filtered above"));
    Some(sorted)
}

/// `p`-th quantile (R-7) of unsorted data.
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    quantile_sorted(&sorted_copy(data)?, p)
}

/// One-pass description of a sample: count, mean, std and the
/// 5/25/50/75/95 percentiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `NaN` when `count < 2`.
    pub std: f64,
    pub min: f64,
    pub p05: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
}

impl Describe {
    /// # Returns
    /// - `None` if `data` is empty or contains NaN/Inf.
    pub fn new(data: &[f64]) -> Option<Self> {
        let mean = mean(data)?;
        let sorted = sorted_copy(data)?;
        let q = |p| quantile_sorted(&sorted, p);
        Some(Self {
            count: data.len(),
            mean,
            std: std_dev(data).unwrap_or(f64::NAN),
            min: sorted[0],
            p05: q(0.05)?,
            p25: q(0.25)?,
            median: q(0.50)?,
            p75: q(0.75)?,
            p95: q(0.95)?,
            max: sorted[sorted.len() - 1],
        })
    }
}
