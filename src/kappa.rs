//! Angular dispersion ↔ Fisher concentration model.
//!
//! - Model G (McElhinny & McFadden, 1997) gives the expected VGP angular
//!   dispersion at a latitude: `S(λ) = √(a² + (bλ)²)`. Defaults are the
//!   PSV10 fit of Doubrovine et al. (2019).
//! - The `κ ↔ S` relation of the Fisher distribution comes from an embedded
//!   table (`data/kappa2angular.csv`, angular standard deviation in degrees
//!   for κ from 1 to 10⁴), interpolated linearly in both directions. The
//!   table is parsed once, on first use.
//! - `latitude_correction` is Cox's (1970) factor converting within-site
//!   directional dispersion to VGP dispersion.

use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmpsiteError};

const KAPPA_TABLE_CSV: &str = include_str!("../data/kappa2angular.csv");

/// The `κ ↔ S` tables, built from the embedded resource on first access.
pub static KAPPA_TABLE: LazyLock<KappaTable> = LazyLock::new(|| {
    KappaTable::parse(KAPPA_TABLE_CSV).expect("embedded kappa table is well-formed")
});

/// Coefficient of the power-law inversion `κ = 72.33 · S^(−1/2)`.
pub const POWER_LAW_COEFFICIENT: f64 = 72.33;

/// Unit of a latitude argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    fn to_degrees(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Degrees => angle,
            AngleUnit::Radians => angle.to_degrees(),
        }
    }
}

/// How to turn an angular dispersion into a concentration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Inversion {
    /// Inverse lookup in the tabulated `S → κ` relation.
    #[default]
    Interpolation,
    /// Empirical fit `κ = 72.33 · S^(−1/2)`.
    PowerLaw,
}

impl FromStr for Inversion {
    type Err = SmpsiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "interpolation" => Ok(Inversion::Interpolation),
            "power-law" => Ok(Inversion::PowerLaw),
            other => Err(SmpsiteError::InvalidArgument(format!(
                "unknown inversion '{other}' (expected 'interpolation' or 'power-law')"
            ))),
        }
    }
}

/// Model G parameters `a`, `b` (degrees, dimensionless).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelG {
    pub a: f64,
    pub b: f64,
}

impl Default for ModelG {
    /// PSV10 (last 10 Myr), Doubrovine et al. (2019).
    fn default() -> Self {
        Self { a: 11.23, b: 0.27 }
    }
}

impl ModelG {
    pub fn angular_dispersion(&self, latitude: f64, unit: AngleUnit) -> f64 {
        angular_dispersion_from_latitude(latitude, self.a, self.b, unit)
    }

    pub fn kappa(&self, latitude: f64, unit: AngleUnit, inversion: Inversion) -> Result<f64> {
        kappa_from_latitude(latitude, self.a, self.b, unit, inversion)
    }
}

/// Piecewise-linear interpolant over strictly increasing abscissae.
#[derive(Debug, Clone, PartialEq)]
pub struct Interp1d {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Interp1d {
    /// # Errors
    /// `InvalidArgument` if lengths differ, fewer than two points are given,
    /// or `x` is not strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || x.len() < 2 {
            return Err(SmpsiteError::InvalidArgument(format!(
                "interpolation needs two or more paired points, got {} x and {} y",
                x.len(),
                y.len()
            )));
        }
        if !x.windows(2).all(|w| w[0] < w[1]) {
            return Err(SmpsiteError::InvalidArgument(
                "interpolation abscissae must be strictly increasing".into(),
            ));
        }
        Ok(Self { x, y })
    }

    pub fn min_x(&self) -> f64 {
        self.x[0]
    }

    pub fn max_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// # Errors
    /// `OutOfRange` outside `[min_x, max_x]` (no extrapolation).
    pub fn eval(&self, at: f64) -> Result<f64> {
        let (min, max) = (self.min_x(), self.max_x());
        if !(min..=max).contains(&at) {
            return Err(SmpsiteError::OutOfRange {
                value: at,
                min,
                max,
            });
        }
        let hi = self.x.partition_point(|&v| v < at).max(1);
        let lo = hi - 1;
        let t = (at - self.x[lo]) / (self.x[hi] - self.x[lo]);
        Ok(self.y[lo] + t * (self.y[hi] - self.y[lo]))
    }
}

/// Forward (`κ → S`) and inverse (`S → κ`) interpolation tables.
#[derive(Debug, Clone, PartialEq)]
pub struct KappaTable {
    forward: Interp1d,
    inverse: Interp1d,
}

impl KappaTable {
    /// Parses a `kappa,std_angular` CSV with a header row.
    pub fn parse(csv: &str) -> Result<Self> {
        let mut kappa = Vec::new();
        let mut angular = Vec::new();
        for (lineno, line) in csv.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parse = |field: Option<&str>| -> Result<f64> {
                field
                    .and_then(|f| f.trim().parse::<f64>().ok())
                    .ok_or_else(|| {
                        SmpsiteError::InvalidArgument(format!(
                            "kappa table line {}: '{line}'",
                            lineno + 1
                        ))
                    })
            };
            let mut fields = line.split(',');
            kappa.push(parse(fields.next())?);
            angular.push(parse(fields.next())?);
        }
        let forward = Interp1d::new(kappa.clone(), angular.clone())?;
        // S falls as κ grows; the inverse needs ascending S.
        kappa.reverse();
        angular.reverse();
        let inverse = Interp1d::new(angular, kappa)?;
        Ok(Self { forward, inverse })
    }

    /// Angular standard deviation (degrees) for concentration `kappa`.
    pub fn kappa_to_angular(&self, kappa: f64) -> Result<f64> {
        self.forward.eval(kappa)
    }

    /// Concentration for angular standard deviation `s` (degrees).
    pub fn angular_to_kappa(&self, s: f64) -> Result<f64> {
        self.inverse.eval(s)
    }
}

/// Angular standard deviation (degrees) of a Fisher distribution.
pub fn kappa2angular(kappa: f64) -> Result<f64> {
    KAPPA_TABLE.kappa_to_angular(kappa)
}

/// Fisher concentration for an angular standard deviation (degrees).
pub fn angular2kappa(s: f64) -> Result<f64> {
    KAPPA_TABLE.angular_to_kappa(s)
}

/// Model G VGP angular dispersion (degrees) at `latitude`:
/// `S = √(a² + (b·|λ|)²)`, `λ` in degrees.
///
/// # Examples
/// ```
/// use smpsite::kappa::{angular_dispersion_from_latitude, AngleUnit};
/// assert_eq!(angular_dispersion_from_latitude(0.0, 11.23, 0.27, AngleUnit::Degrees), 11.23);
/// ```
pub fn angular_dispersion_from_latitude(latitude: f64, a: f64, b: f64, unit: AngleUnit) -> f64 {
    let lat = unit.to_degrees(latitude).abs();
    (a * a + (b * lat).powi(2)).sqrt()
}

/// Theoretical VGP concentration at `latitude` under Model G.
///
/// # Errors
/// `OutOfRange` if the interpolated lookup leaves the tabulated range.
pub fn kappa_from_latitude(
    latitude: f64,
    a: f64,
    b: f64,
    unit: AngleUnit,
    inversion: Inversion,
) -> Result<f64> {
    let s = angular_dispersion_from_latitude(latitude, a, b, unit);
    match inversion {
        Inversion::PowerLaw => Ok(POWER_LAW_COEFFICIENT * s.powf(-0.5)),
        Inversion::Interpolation => angular2kappa(s),
    }
}

/// Cox (1970) latitude correction `(5 + 18 sin²λ + 9 sin⁴λ) / 8`.
///
/// # Examples
/// ```
/// use smpsite::kappa::{latitude_correction, AngleUnit};
/// assert_eq!(latitude_correction(0.0, AngleUnit::Degrees), 5.0 / 8.0);
/// assert!((latitude_correction(90.0, AngleUnit::Degrees) - 4.0).abs() < 1e-12);
/// ```
pub fn latitude_correction(latitude: f64, unit: AngleUnit) -> f64 {
    let sn2 = unit.to_degrees(latitude).to_radians().sin().powi(2);
    (5.0 + 18.0 * sn2 + 9.0 * sn2 * sn2) / 8.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Fisher;
    use approx::assert_relative_eq;

    #[test]
    fn test_table_loads() {
        let table = &*KAPPA_TABLE;
        assert_relative_eq!(table.forward.min_x(), 1.0);
        assert_relative_eq!(table.forward.max_x(), 10_000.0);
    }

    #[test]
    fn test_table_matches_quadrature() {
        for kappa in [1.0, 9.5, 52.0, 400.0, 3000.0] {
            let tabulated = kappa2angular(kappa).unwrap();
            let exact = Fisher::new(kappa).unwrap().angular_std();
            assert_relative_eq!(tabulated, exact, max_relative = 2e-3);
        }
    }

    #[test]
    fn test_forward_inverse_consistent() {
        for kappa in [2.0, 15.0, 80.0, 650.0] {
            let s = kappa2angular(kappa).unwrap();
            assert_relative_eq!(angular2kappa(s).unwrap(), kappa, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(kappa2angular(0.5), Err(SmpsiteError::OutOfRange { .. })));
        assert!(matches!(angular2kappa(90.0), Err(SmpsiteError::OutOfRange { .. })));
    }

    #[test]
    fn test_angular_dispersion_equator_is_a() {
        assert_eq!(angular_dispersion_from_latitude(0.0, 11.23, 0.27, AngleUnit::Degrees), 11.23);
        assert_eq!(angular_dispersion_from_latitude(0.0, 7.5, 0.9, AngleUnit::Radians), 7.5);
    }

    #[test]
    fn test_angular_dispersion_symmetric_and_units() {
        let north = angular_dispersion_from_latitude(45.0, 11.23, 0.27, AngleUnit::Degrees);
        let south = angular_dispersion_from_latitude(-45.0, 11.23, 0.27, AngleUnit::Degrees);
        let rad = angular_dispersion_from_latitude(
            -std::f64::consts::FRAC_PI_4,
            11.23,
            0.27,
            AngleUnit::Radians,
        );
        assert_eq!(north, south);
        assert_relative_eq!(north, rad, epsilon = 1e-12);
        assert_relative_eq!(north, (11.23_f64.powi(2) + (0.27 * 45.0_f64).powi(2)).sqrt());
    }

    #[test]
    fn test_kappa_from_latitude_power_law() {
        let k = kappa_from_latitude(0.0, 16.0, 0.3, AngleUnit::Degrees, Inversion::PowerLaw).unwrap();
        assert_relative_eq!(k, 72.33 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kappa_from_latitude_interpolation_decreases_poleward() {
        let g = ModelG::default();
        let equator = g.kappa(0.0, AngleUnit::Degrees, Inversion::Interpolation).unwrap();
        let pole = g.kappa(90.0, AngleUnit::Degrees, Inversion::Interpolation).unwrap();
        assert!(equator > pole);
        // S = 11.23° ↔ κ ≈ (81/11.23)²
        assert_relative_eq!(equator, (81.0_f64 / 11.23).powi(2), max_relative = 0.02);
    }

    #[test]
    fn test_inversion_from_str() {
        assert_eq!("interpolation".parse::<Inversion>().unwrap(), Inversion::Interpolation);
        assert_eq!("power-law".parse::<Inversion>().unwrap(), Inversion::PowerLaw);
        assert!(matches!(
            "spline".parse::<Inversion>(),
            Err(SmpsiteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_latitude_correction() {
        assert_relative_eq!(latitude_correction(0.0, AngleUnit::Degrees), 0.625);
        assert_relative_eq!(latitude_correction(90.0, AngleUnit::Degrees), 4.0, epsilon = 1e-12);
        let s2 = 0.5;
        assert_relative_eq!(
            latitude_correction(std::f64::consts::FRAC_PI_4, AngleUnit::Radians),
            (5.0 + 18.0 * s2 + 9.0 * s2 * s2) / 8.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_interp1d_validation() {
        assert!(Interp1d::new(vec![0.0], vec![1.0]).is_err());
        assert!(Interp1d::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Interp1d::new(vec![0.0, 1.0], vec![1.0]).is_err());
        let f = Interp1d::new(vec![0.0, 1.0, 3.0], vec![0.0, 10.0, 30.0]).unwrap();
        assert_relative_eq!(f.eval(0.0).unwrap(), 0.0);
        assert_relative_eq!(f.eval(2.0).unwrap(), 20.0);
        assert_relative_eq!(f.eval(3.0).unwrap(), 30.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(KappaTable::parse("kappa,std_angular\n1,abc\n2,3\n").is_err());
    }
}
