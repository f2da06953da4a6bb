//! Fisher (1953) statistics for unit directions.
//!
//! # Definitions
//! For `N` unit vectors with vector sum `X`:
//! - resultant length `R = |X|`, `0 ≤ R ≤ N`
//! - mean direction `X / R`
//! - precision parameter `k = (N − 1) / (N − R)`
//! - `α95 = acos(1 − (N − R)/R · (20^{1/(N−1)} − 1))`
//! - circular standard deviation `81 / √k`
//!
//! Reference: Fisher (1953), "Dispersion on a sphere", *Proc. R. Soc. A* 217.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// Fisher mean of a set of directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FisherMean {
    pub dec: f64,
    pub inc: f64,
    /// Number of directions averaged.
    pub n: usize,
    /// Resultant length, clamped to `[0, n]`.
    pub r: f64,
    /// Precision parameter; `INFINITY` for a single direction or when all
    /// directions coincide.
    pub k: f64,
    /// 95% confidence cone (degrees); `NaN` for fewer than two directions.
    pub alpha95: f64,
    /// Circular standard deviation (degrees).
    pub csd: f64,
}

impl FisherMean {
    pub fn direction(&self) -> Direction {
        Direction::new(self.dec, self.inc)
    }
}

/// Computes the Fisher mean of `directions`.
///
/// # Returns
/// - `None` if `directions` is empty.
///
/// # Examples
/// ```
/// use smpsite::pmag::{fisher_mean, Direction};
/// let dirs = [Direction::new(350.0, 40.0), Direction::new(10.0, 40.0)];
/// let m = fisher_mean(&dirs).unwrap();
/// assert!(m.dec.abs() < 1e-9 || (m.dec - 360.0).abs() < 1e-9);
/// assert!(m.r < 2.0);
/// ```
pub fn fisher_mean(directions: &[Direction]) -> Option<FisherMean> {
    if directions.is_empty() {
        return None;
    }
    let n = directions.len();
    let nf = n as f64;

    let sum: Vector3<f64> = directions
        .iter()
        .map(Direction::to_unit_vector)
        .fold(Vector3::zeros(), |acc, v| acc + v);
    // Rounding can push R of identical directions a hair above N.
    let r = sum.norm().min(nf);
    let mean = Direction::from_vector(&sum);

    let k = if n >= 2 && r < nf {
        (nf - 1.0) / (nf - r)
    } else {
        f64::INFINITY
    };
    let alpha95 = if n >= 2 {
        let b = 20.0_f64.powf(1.0 / (nf - 1.0)) - 1.0;
        let a = (1.0 - b * (nf - r) / r).clamp(-1.0, 1.0);
        a.acos().to_degrees()
    } else {
        f64::NAN
    };
    let csd = 81.0 / k.sqrt();

    Some(FisherMean {
        dec: mean.dec,
        inc: mean.inc,
        n,
        r,
        k,
        alpha95,
        csd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_empty_is_none() {
        assert!(fisher_mean(&[]).is_none());
    }

    #[test]
    fn test_single_direction() {
        let m = fisher_mean(&[Direction::new(123.0, -45.0)]).unwrap();
        assert_abs_diff_eq!(m.dec, 123.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.inc, -45.0, epsilon = 1e-9);
        assert_eq!(m.n, 1);
        assert_relative_eq!(m.r, 1.0, epsilon = 1e-12);
        assert!(m.alpha95.is_nan());
    }

    #[test]
    fn test_identical_directions() {
        let d = Direction::new(20.0, 60.0);
        let m = fisher_mean(&[d, d, d]).unwrap();
        assert_relative_eq!(m.r, 3.0, epsilon = 1e-12);
        assert!(m.k > 1e10);
        assert!(m.alpha95 < 1e-3);
    }

    #[test]
    fn test_symmetric_pair() {
        let m = fisher_mean(&[Direction::new(0.0, 30.0), Direction::new(0.0, 50.0)]).unwrap();
        assert_abs_diff_eq!(m.inc, 40.0, epsilon = 1e-9);
        assert_relative_eq!(m.r, 2.0 * 10.0_f64.to_radians().cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let m = fisher_mean(&[Direction::new(0.0, 0.0), Direction::new(180.0, 0.0)]).unwrap();
        assert!(m.r < 1e-12);
        assert_relative_eq!(m.k, 0.5, epsilon = 1e-9);
    }
}
