//! Spherical probability distributions.
//!
//! | Distribution | Parameters | Sampling |
//! |---|---|---|
//! | [`Fisher`] | κ > 0 | inverse CDF of the colatitude, uniform azimuth |
//! | [`UniformSphere`] | none | uniform longitude, `asin` of uniform `[-1, 1]` |
//!
//! Both sample through an explicit `&mut R: Rng`.

use nalgebra::Vector3;
use rand::Rng;
use thiserror::Error;

use crate::pmag::{Direction, Pole};

/// Error type for invalid distribution parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    /// Parameters violate distribution constraints.
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
}

// ============================================================================
// Fisher Distribution
// ============================================================================

/// Fisher (1953) distribution on the unit sphere with concentration `κ`.
///
/// # Mathematical Definition
/// Angle `θ` from the mean direction has density
/// ```text
/// f(θ) = κ / (2 sinh κ) · exp(κ cos θ) · sin θ,   θ ∈ [0, π]
/// ```
/// and azimuth uniform on `[0, 2π)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fisher {
    kappa: f64,
}

impl Fisher {
    /// Creates a Fisher distribution.
    ///
    /// # Errors
    /// Returns `Err` if `kappa ≤ 0` or is not finite.
    pub fn new(kappa: f64) -> Result<Self, DistributionError> {
        if !kappa.is_finite() || kappa <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Fisher requires finite κ > 0, got κ={kappa}"
            )));
        }
        Ok(Self { kappa })
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Draws the angle from the mean direction, degrees.
    ///
    /// # Algorithm
    /// With `L = e^{−2κ}` and `u ~ U[0, 1)`:
    /// `θ = 2 asin(√(−ln(u(1 − L) + L) / 2κ))`.
    pub fn sample_colatitude<R: Rng>(&self, rng: &mut R) -> f64 {
        let l = (-2.0 * self.kappa).exp();
        let a = rng.random::<f64>() * (1.0 - l) + l;
        let fac = (-a.ln() / (2.0 * self.kappa)).sqrt().min(1.0);
        (2.0 * fac.asin()).to_degrees()
    }

    /// Draws one direction Fisher-distributed about `mean`.
    pub fn sample_around<R: Rng>(&self, mean: &Direction, rng: &mut R) -> Direction {
        let theta = self.sample_colatitude(rng).to_radians();
        let phi = rng.random_range(0.0..std::f64::consts::TAU);

        let m = mean.to_unit_vector();
        let helper = if m.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::x()
        };
        let e1 = helper.cross(&m).normalize();
        let e2 = m.cross(&e1);
        let (ts, tc) = theta.sin_cos();
        let (ps, pc) = phi.sin_cos();
        Direction::from_vector(&(m * tc + (e1 * pc + e2 * ps) * ts))
    }

    /// Draws `n` directions about `mean`.
    pub fn sample_n<R: Rng>(&self, mean: &Direction, n: usize, rng: &mut R) -> Vec<Direction> {
        (0..n).map(|_| self.sample_around(mean, rng)).collect()
    }

    /// Mean squared angle from the mean direction, `E[θ²]` in rad².
    ///
    /// # Algorithm
    /// Composite Simpson's rule on `[0, π]` with the density rescaled by
    /// `e^{−κ}` so large `κ` does not overflow.
    pub fn mean_square_angle(&self) -> f64 {
        const STEPS: usize = 20_000;
        let h = std::f64::consts::PI / STEPS as f64;
        let (mut mass, mut second) = (0.0, 0.0);
        for i in 0..=STEPS {
            let theta = i as f64 * h;
            let weight = if i == 0 || i == STEPS {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            let f = (self.kappa * (theta.cos() - 1.0)).exp() * theta.sin();
            mass += weight * f;
            second += weight * f * theta * theta;
        }
        second / mass
    }

    /// Angular standard deviation `√E[θ²]`, degrees. Approaches `81/√κ`
    /// for large `κ`.
    pub fn angular_std(&self) -> f64 {
        self.mean_square_angle().sqrt().to_degrees()
    }
}

// ============================================================================
// Uniform on the sphere
// ============================================================================

/// Uniform distribution of pole positions over the whole sphere.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UniformSphere;

impl UniformSphere {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Pole {
        let lon = rng.random_range(0.0..360.0);
        let z: f64 = rng.random_range(-1.0..=1.0);
        Pole::new(lon, z.asin().to_degrees())
    }

    pub fn sample_n<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Pole> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn fisher_colatitude_in_range(seed in 0_u64..10000, kappa in 0.01_f64..1000.0) {
            let fisher = Fisher::new(kappa).unwrap();
            let mut rng = create_rng(seed);
            let theta = fisher.sample_colatitude(&mut rng);
            prop_assert!((0.0..=180.0).contains(&theta));
        }

        #[test]
        fn fisher_sample_is_unit_direction(
            seed in 0_u64..10000,
            dec in 0.0_f64..360.0,
            inc in -90.0_f64..=90.0,
        ) {
            let fisher = Fisher::new(10.0).unwrap();
            let mut rng = create_rng(seed);
            let d = fisher.sample_around(&Direction::new(dec, inc), &mut rng);
            prop_assert!((-90.0..=90.0).contains(&d.inc));
            prop_assert!((0.0..360.0).contains(&d.dec));
        }
    }
}
