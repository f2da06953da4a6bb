//! TK03.GAD statistical field model (Tauxe & Kent, 2004).
//!
//! A giant Gaussian process: each Gauss coefficient `g_l^m`, `h_l^m` is an
//! independent normal deviate. The axial dipole has mean `g10`, everything
//! else has mean zero (optionally `g20`, `g30` as fractions of `g10`).
//!
//! # Variances
//! ```text
//! σ_l² = (c/a)^{2l} α² / ((l + 1)(2l + 1)),   α = g10 / 2.4,  c/a = 0.547
//! σ_l^m = β σ_l  when l − m is odd (β = 3.8), σ_l otherwise
//! ```
//!
//! The field at a site is synthesized from Schmidt semi-normalized
//! associated Legendre functions at the Earth's surface (`r = a`,
//! geocentric), giving `(X, Y, Z)` = (north, east, down).

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::direction::Direction;
use crate::distributions::DistributionError;

const ALPHA_FACTOR: f64 = 2.4;
const BETA: f64 = 3.8;
const C_OVER_A: f64 = 0.547;

/// Parameters of a TK03-type giant Gaussian process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tk03 {
    /// Axial dipole mean (nT).
    pub g10: f64,
    /// Axial quadrupole as a fraction of `g10`.
    pub g2: f64,
    /// Axial octupole as a fraction of `g10`.
    pub g3: f64,
    /// Maximum spherical harmonic degree.
    pub degree: usize,
}

impl Default for Tk03 {
    fn default() -> Self {
        Self {
            g10: -18e3,
            g2: 0.0,
            g3: 0.0,
            degree: 8,
        }
    }
}

impl Tk03 {
    fn sigma(&self, l: usize) -> f64 {
        let alpha = self.g10 / ALPHA_FACTOR;
        let l_f = l as f64;
        (C_OVER_A.powf(2.0 * l_f) * alpha * alpha / ((l_f + 1.0) * (2.0 * l_f + 1.0))).sqrt()
    }

    /// Draws one set of Gauss coefficients in the usual flat order
    /// `g10, g11, h11, g20, g21, h21, g22, h22, …` (no `h_l^0`).
    ///
    /// # Errors
    /// Returns `Err` if `g10` (or a derived mean) is not finite.
    pub fn sample_coefficients<R: Rng>(&self, rng: &mut R) -> Result<Vec<f64>, DistributionError> {
        let mut gh = Vec::with_capacity(self.degree * (self.degree + 2));
        for l in 1..=self.degree {
            let sigma_l = self.sigma(l);
            for m in 0..=l {
                let sigma = if (l - m) % 2 == 1 { BETA * sigma_l } else { sigma_l };
                let mean = match (l, m) {
                    (1, 0) => self.g10,
                    (2, 0) => self.g2 * self.g10,
                    (3, 0) => self.g3 * self.g10,
                    _ => 0.0,
                };
                gh.push(gaussian(mean, sigma, rng)?);
                if m > 0 {
                    gh.push(gaussian(0.0, sigma, rng)?);
                }
            }
        }
        Ok(gh)
    }

    /// Draws one direction at `site_lat` from the model: fresh coefficients,
    /// random site longitude, declination offset by `dec`.
    pub fn sample_direction<R: Rng>(
        &self,
        dec: f64,
        site_lat: f64,
        rng: &mut R,
    ) -> Result<Direction, DistributionError> {
        let gh = self.sample_coefficients(rng)?;
        let lon = rng.random_range(0.0..360.0);
        let field = synthesize_field(&gh, self.degree, site_lat, lon);
        let d = Direction::from_vector(&field);
        Ok(Direction::new(super::wrap_degrees(d.dec + dec), d.inc))
    }
}

/// One `N(mean, sigma)` deviate.
fn gaussian<R: Rng>(mean: f64, sigma: f64, rng: &mut R) -> Result<f64, DistributionError> {
    let dist = Normal::new(mean, sigma).map_err(|e| {
        DistributionError::InvalidParameters(format!("TK03 coefficient N({mean}, {sigma}): {e}"))
    })?;
    Ok(dist.sample(rng))
}

/// Schmidt semi-normalized `P_l^m(cos θ)` and `dP_l^m/dθ`, indexed `[l][m]`.
fn schmidt_legendre(degree: usize, theta: f64) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let (s, c) = theta.sin_cos();
    let mut p = vec![vec![0.0; degree + 1]; degree + 1];
    let mut dp = vec![vec![0.0; degree + 1]; degree + 1];
    p[0][0] = 1.0;

    for l in 1..=degree {
        let l_f = l as f64;
        for m in 0..=l {
            let m_f = m as f64;
            if m == l {
                if l == 1 {
                    p[1][1] = s;
                    dp[1][1] = c;
                } else {
                    let f = ((2.0 * l_f - 1.0) / (2.0 * l_f)).sqrt();
                    p[l][l] = f * s * p[l - 1][l - 1];
                    dp[l][l] = f * (c * p[l - 1][l - 1] + s * dp[l - 1][l - 1]);
                }
            } else {
                let (p2, dp2) = if l >= 2 && l - 2 >= m {
                    (p[l - 2][m], dp[l - 2][m])
                } else {
                    (0.0, 0.0)
                };
                let k = ((l_f - 1.0).powi(2) - m_f * m_f).max(0.0).sqrt();
                let norm = (l_f * l_f - m_f * m_f).sqrt();
                p[l][m] = ((2.0 * l_f - 1.0) * c * p[l - 1][m] - k * p2) / norm;
                dp[l][m] = ((2.0 * l_f - 1.0) * (c * dp[l - 1][m] - s * p[l - 1][m]) - k * dp2)
                    / norm;
            }
        }
    }
    (p, dp)
}

/// Field `(X, Y, Z)` = (north, east, down) at the surface for flat Gauss
/// coefficients `gh` up to `degree`.
pub fn synthesize_field(gh: &[f64], degree: usize, lat: f64, lon: f64) -> Vector3<f64> {
    let theta = (90.0 - lat).to_radians();
    let phi = lon.to_radians();
    // Keep 1/sin θ finite at the geographic poles.
    let sin_theta = theta.sin().abs().max(1e-10);
    let (p, dp) = schmidt_legendre(degree, theta);

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    let mut idx = 0;
    for l in 1..=degree {
        for m in 0..=l {
            let g = gh.get(idx).copied().unwrap_or(0.0);
            idx += 1;
            let h = if m > 0 {
                let h = gh.get(idx).copied().unwrap_or(0.0);
                idx += 1;
                h
            } else {
                0.0
            };
            let (ms, mc) = (m as f64 * phi).sin_cos();
            let gc = g * mc + h * ms;
            x += gc * dp[l][m];
            y += m as f64 * (g * ms - h * mc) * p[l][m] / sin_theta;
            z -= (l as f64 + 1.0) * gc * p[l][m];
        }
    }
    Vector3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmag::fisher_mean;
    use crate::random::create_rng;
    use approx::assert_abs_diff_eq;

    fn gad_inclination(lat: f64) -> f64 {
        (2.0 * lat.to_radians().tan()).atan().to_degrees()
    }

    #[test]
    fn test_legendre_low_degree() {
        let theta = 0.7_f64;
        let (s, c) = theta.sin_cos();
        let (p, dp) = schmidt_legendre(2, theta);
        assert_abs_diff_eq!(p[1][0], c, epsilon = 1e-14);
        assert_abs_diff_eq!(p[1][1], s, epsilon = 1e-14);
        assert_abs_diff_eq!(p[2][0], 1.5 * c * c - 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(p[2][1], 3.0_f64.sqrt() * c * s, epsilon = 1e-14);
        assert_abs_diff_eq!(p[2][2], 3.0_f64.sqrt() / 2.0 * s * s, epsilon = 1e-14);
        assert_abs_diff_eq!(dp[1][0], -s, epsilon = 1e-14);
        assert_abs_diff_eq!(dp[2][0], -3.0 * c * s, epsilon = 1e-14);
        assert_abs_diff_eq!(dp[2][2], 3.0_f64.sqrt() * s * c, epsilon = 1e-14);
    }

    #[test]
    fn test_axial_dipole_field() {
        let mut gh = vec![0.0; 8 * 10];
        gh[0] = -30000.0;
        for lat in [-45.0, 0.0, 30.0, 60.0] {
            let d = Direction::from_vector(&synthesize_field(&gh, 8, lat, 77.0));
            assert_abs_diff_eq!(d.inc, gad_inclination(lat), epsilon = 1e-9);
            assert_abs_diff_eq!(d.dec.min(360.0 - d.dec), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_equatorial_dipole_vertical_on_axis() {
        // g11 alone: the dipole axis pierces (0°N, 0°E), so the field there is vertical.
        let mut gh = vec![0.0; 3];
        gh[1] = -30000.0;
        let f = synthesize_field(&gh, 1, 0.0, 0.0);
        assert_abs_diff_eq!(f.x, 0.0, epsilon = 1e-9);
        assert!(f.z.abs() > 1.0);
    }

    #[test]
    fn test_coefficient_count() {
        let mut rng = create_rng(1);
        let gh = Tk03::default().sample_coefficients(&mut rng).unwrap();
        assert_eq!(gh.len(), 8 * 10);
    }

    #[test]
    fn test_coefficient_spread_by_degree() {
        let model = Tk03::default();
        let mut rng = create_rng(8);
        let n = 4000;
        let draws: Vec<Vec<f64>> = (0..n)
            .map(|_| model.sample_coefficients(&mut rng).unwrap())
            .collect();
        let rms = |i: usize| (draws.iter().map(|gh| gh[i] * gh[i]).sum::<f64>() / n as f64).sqrt();
        let g10 = draws.iter().map(|gh| gh[0]).sum::<f64>() / n as f64;
        assert!((g10 - model.g10).abs() < 0.05 * model.g10.abs(), "g10 = {g10}");
        // g11: l − m even, σ_1. g21: l − m odd, β σ_2.
        let (s1, s2) = (model.sigma(1), model.sigma(2));
        assert_abs_diff_eq!(rms(1), s1, epsilon = 0.05 * s1);
        assert_abs_diff_eq!(rms(4), BETA * s2, epsilon = 0.05 * BETA * s2);
    }

    #[test]
    fn test_non_finite_dipole_rejected() {
        let model = Tk03 {
            g10: f64::NAN,
            ..Tk03::default()
        };
        let mut rng = create_rng(1);
        assert!(model.sample_coefficients(&mut rng).is_err());
        assert!(model.sample_direction(0.0, 30.0, &mut rng).is_err());
    }

    #[test]
    fn test_mean_direction_near_gad() {
        let model = Tk03::default();
        let mut rng = create_rng(2024);
        let dirs: Vec<Direction> = (0..2000)
            .map(|_| model.sample_direction(0.0, 30.0, &mut rng).unwrap())
            .collect();
        let mean = fisher_mean(&dirs).unwrap();
        assert!(mean.dec.min(360.0 - mean.dec) < 3.0, "dec = {}", mean.dec);
        assert!(
            (mean.inc - gad_inclination(30.0)).abs() < 8.0,
            "inc = {}",
            mean.inc
        );
    }
}
