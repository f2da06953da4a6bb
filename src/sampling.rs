//! Synthetic sampling designs.
//!
//! A design spreads `total_samples` specimens over sites of
//! `samples_per_site` (the first sites absorb the remainder, one extra
//! specimen each). For every site a true mean direction is drawn from a
//! secular-variation model; specimens scatter about it with Fisher
//! concentration `kappa_within_site`. Each specimen is independently an
//! outlier with probability `outlier_rate`: its direction is thrown away and
//! its VGP drawn uniformly on the sphere.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distributions::{Fisher, UniformSphere};
use crate::error::{Result, SmpsiteError};
use crate::kappa::{AngleUnit, Inversion, ModelG};
use crate::pmag::{direction_to_vgp, vgp_to_direction, Direction, Pole, Tk03};
use crate::random::bernoulli_flags;

/// Model used to draw the true site-mean directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecularMethod {
    /// TK03.GAD giant Gaussian process.
    #[default]
    #[serde(rename = "tk03")]
    Tk03,
    /// Fisher VGPs with the Model G concentration at the site latitude.
    #[serde(rename = "G")]
    G,
    /// Fisher VGPs with an explicit `kappa_secular`.
    #[serde(rename = "fisher")]
    Fisher,
}

impl FromStr for SecularMethod {
    type Err = SmpsiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tk03" => Ok(SecularMethod::Tk03),
            "G" => Ok(SecularMethod::G),
            "fisher" => Ok(SecularMethod::Fisher),
            other => Err(SmpsiteError::InvalidArgument(format!(
                "unknown secular method '{other}' (expected 'tk03', 'G' or 'fisher')"
            ))),
        }
    }
}

impl fmt::Display for SecularMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecularMethod::Tk03 => "tk03",
            SecularMethod::G => "G",
            SecularMethod::Fisher => "fisher",
        })
    }
}

/// Parameters of one simulated sampling design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Fisher concentration of specimens about their site mean.
    pub kappa_within_site: f64,
    /// Site latitude (degrees); governs the secular dispersion.
    pub site_lat: f64,
    /// Site longitude (degrees).
    pub site_long: f64,
    /// Per-specimen outlier probability.
    pub outlier_rate: f64,
    pub samples_per_site: usize,
    pub total_samples: usize,
    #[serde(default)]
    pub secular_method: SecularMethod,
    /// Required for [`SecularMethod::Fisher`], ignored otherwise.
    #[serde(default)]
    pub kappa_secular: Option<f64>,
}

impl SamplingParams {
    /// Creates validated parameters with the TK03 secular model.
    ///
    /// # Errors
    /// See [`SamplingParams::validate`].
    pub fn new(
        kappa_within_site: f64,
        site_lat: f64,
        site_long: f64,
        outlier_rate: f64,
        samples_per_site: usize,
        total_samples: usize,
    ) -> Result<Self> {
        let params = Self {
            kappa_within_site,
            site_lat,
            site_long,
            outlier_rate,
            samples_per_site,
            total_samples,
            secular_method: SecularMethod::default(),
            kappa_secular: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Replaces the secular-variation model.
    pub fn with_secular(mut self, method: SecularMethod, kappa_secular: Option<f64>) -> Result<Self> {
        self.secular_method = method;
        self.kappa_secular = kappa_secular;
        self.validate()?;
        Ok(self)
    }

    /// Checks every field.
    ///
    /// # Errors
    /// `InvalidArgument` if a concentration is not positive, the latitude
    /// or outlier rate is out of range, `samples_per_site` is zero, or the
    /// total cannot be split into groups of `n0` or `n0 + 1`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SmpsiteError::InvalidArgument(msg));
        if !self.kappa_within_site.is_finite() || self.kappa_within_site <= 0.0 {
            return invalid(format!("kappa_within_site must be > 0, got {}", self.kappa_within_site));
        }
        if !(-90.0..=90.0).contains(&self.site_lat) {
            return invalid(format!("site_lat must be in [-90, 90], got {}", self.site_lat));
        }
        if !self.site_long.is_finite() {
            return invalid(format!("site_long must be finite, got {}", self.site_long));
        }
        if !(0.0..=1.0).contains(&self.outlier_rate) {
            return invalid(format!("outlier_rate must be in [0, 1], got {}", self.outlier_rate));
        }
        if self.samples_per_site == 0 {
            return invalid("samples_per_site must be at least 1".into());
        }
        let n_sites = self.n_sites();
        if n_sites == 0 || self.total_samples % self.samples_per_site > n_sites {
            return invalid(format!(
                "{} samples cannot be split into sites of {} or {}",
                self.total_samples,
                self.samples_per_site,
                self.samples_per_site + 1
            ));
        }
        if self.secular_method == SecularMethod::Fisher {
            match self.kappa_secular {
                Some(k) if k.is_finite() && k > 0.0 => {}
                other => return invalid(format!("fisher secular model needs kappa_secular > 0, got {other:?}")),
            }
        }
        Ok(())
    }

    /// Number of sites in the design.
    pub fn n_sites(&self) -> usize {
        self.total_samples / self.samples_per_site
    }

    /// Concentration of the true VGP distribution: Model G at the site
    /// latitude for `tk03`/`G`, `kappa_secular` for `fisher`.
    pub fn secular_kappa(&self) -> Result<f64> {
        match self.secular_method {
            SecularMethod::Tk03 | SecularMethod::G => {
                ModelG::default().kappa(self.site_lat, AngleUnit::Degrees, Inversion::Interpolation)
            }
            SecularMethod::Fisher => self.kappa_secular.ok_or_else(|| {
                SmpsiteError::InvalidArgument("fisher secular model needs kappa_secular".into())
            }),
        }
    }
}

/// Splits the total sample count into per-site group sizes.
///
/// The first `total % n0` sites get `n0 + 1` samples, the rest `n0`.
///
/// # Panics
/// Panics if the parameters cannot be balanced (rejected by
/// [`SamplingParams::validate`]).
///
/// # Examples
/// ```
/// use smpsite::sampling::{generate_design, SamplingParams};
/// let params = SamplingParams::new(50.0, 30.0, 0.0, 0.0, 3, 11).unwrap();
/// assert_eq!(generate_design(&params), vec![4, 4, 3]);
/// ```
pub fn generate_design(params: &SamplingParams) -> Vec<usize> {
    let n0 = params.samples_per_site;
    let mut design = vec![n0; params.n_sites()];
    for size in design.iter_mut().take(params.total_samples % n0) {
        *size += 1;
    }
    assert_eq!(
        design.iter().sum::<usize>(),
        params.total_samples,
        "design does not partition the total sample count"
    );
    assert!(design.iter().all(|&n| n == n0 || n == n0 + 1));
    design
}

/// One simulated specimen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub site: usize,
    pub dec: f64,
    pub inc: f64,
    pub vgp_lon: f64,
    pub vgp_lat: f64,
    pub is_outlier: bool,
}

impl SampleRow {
    pub fn direction(&self) -> Direction {
        Direction::new(self.dec, self.inc)
    }

    pub fn vgp(&self) -> Pole {
        Pole::new(self.vgp_lon, self.vgp_lat)
    }
}

/// All specimens of one simulated trial, grouped by ascending site index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    pub rows: Vec<SampleRow>,
}

impl SampleTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRow> {
        self.rows.iter()
    }

    pub fn n_outliers(&self) -> usize {
        self.rows.iter().filter(|r| r.is_outlier).count()
    }
}

enum SecularSampler {
    Tk03(Tk03),
    FisherVgp(Fisher),
}

impl SecularSampler {
    fn new(params: &SamplingParams) -> Result<Self> {
        Ok(match params.secular_method {
            SecularMethod::Tk03 => SecularSampler::Tk03(Tk03::default()),
            SecularMethod::G | SecularMethod::Fisher => {
                SecularSampler::FisherVgp(Fisher::new(params.secular_kappa()?)?)
            }
        })
    }

    fn site_mean<R: Rng>(&self, params: &SamplingParams, rng: &mut R) -> Result<Direction> {
        Ok(match self {
            SecularSampler::Tk03(model) => model.sample_direction(0.0, params.site_lat, rng)?,
            SecularSampler::FisherVgp(fisher) => {
                let vgp = Pole::from_direction(&fisher.sample_around(&Pole::NORTH.as_direction(), rng));
                vgp_to_direction(&vgp, params.site_lat, params.site_long)
            }
        })
    }
}

/// Synthesizes one trial's specimen table.
///
/// All site means are drawn first, then each site's outlier flags,
/// in-lier directions and outlier VGPs in turn. In-liers precede
/// outliers within a site. Every in-lier specimen is kept.
///
/// # Errors
/// `InvalidArgument` for invalid parameters; `OutOfRange` if the Model G
/// concentration leaves the tabulated range.
pub fn generate_samples<R: Rng>(params: &SamplingParams, rng: &mut R) -> Result<SampleTable> {
    params.validate()?;
    let design = generate_design(params);
    let secular = SecularSampler::new(params)?;
    let within = Fisher::new(params.kappa_within_site)?;

    let site_means = (0..design.len())
        .map(|_| secular.site_mean(params, rng))
        .collect::<Result<Vec<Direction>>>()?;

    let mut rows = Vec::with_capacity(params.total_samples);
    for (site, (&nk, mean)) in design.iter().zip(&site_means).enumerate() {
        let flags = bernoulli_flags(nk, params.outlier_rate, rng);
        let n_outliers = flags.iter().filter(|f| **f).count();

        for direction in within.sample_n(mean, nk - n_outliers, rng) {
            let vgp = direction_to_vgp(&direction, params.site_lat, params.site_long);
            rows.push(SampleRow {
                site,
                dec: direction.dec,
                inc: direction.inc,
                vgp_lon: vgp.lon,
                vgp_lat: vgp.lat,
                is_outlier: false,
            });
        }
        for vgp in UniformSphere.sample_n(n_outliers, rng) {
            let direction = vgp_to_direction(&vgp, params.site_lat, params.site_long);
            rows.push(SampleRow {
                site,
                dec: direction.dec,
                inc: direction.inc,
                vgp_lon: vgp.lon,
                vgp_lat: vgp.lat,
                is_outlier: true,
            });
        }
    }

    Ok(SampleTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    fn params(n0: usize, total: usize) -> SamplingParams {
        SamplingParams::new(50.0, 30.0, 10.0, 0.0, n0, total).unwrap()
    }

    #[test]
    fn test_design_exact_division() {
        assert_eq!(generate_design(&params(10, 100)), vec![10; 10]);
    }

    #[test]
    fn test_design_remainder_goes_first() {
        assert_eq!(generate_design(&params(4, 18)), vec![5, 5, 4, 4]);
    }

    #[test]
    fn test_design_single_sample_sites() {
        assert_eq!(generate_design(&params(1, 7)), vec![1; 7]);
    }

    #[test]
    fn test_unbalanced_design_rejected() {
        // 5 = 3 + 2: the remainder exceeds the number of sites.
        assert!(matches!(
            SamplingParams::new(50.0, 30.0, 0.0, 0.0, 3, 5),
            Err(SmpsiteError::InvalidArgument(_))
        ));
        assert!(SamplingParams::new(50.0, 30.0, 0.0, 0.0, 3, 2).is_err());
        assert!(SamplingParams::new(50.0, 30.0, 0.0, 0.0, 0, 2).is_err());
    }

    #[test]
    #[should_panic(expected = "design does not partition")]
    fn test_design_panics_when_unbalanced() {
        let unchecked = SamplingParams {
            kappa_within_site: 50.0,
            site_lat: 30.0,
            site_long: 0.0,
            outlier_rate: 0.0,
            samples_per_site: 3,
            total_samples: 5,
            secular_method: SecularMethod::Tk03,
            kappa_secular: None,
        };
        generate_design(&unchecked);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(SamplingParams::new(0.0, 30.0, 0.0, 0.0, 1, 10).is_err());
        assert!(SamplingParams::new(50.0, 95.0, 0.0, 0.0, 1, 10).is_err());
        assert!(SamplingParams::new(50.0, 30.0, 0.0, 1.5, 1, 10).is_err());
        assert!(params(1, 10).with_secular(SecularMethod::Fisher, None).is_err());
        assert!(params(1, 10).with_secular(SecularMethod::Fisher, Some(30.0)).is_ok());
    }

    #[test]
    fn test_secular_method_parse_and_display() {
        for m in [SecularMethod::Tk03, SecularMethod::G, SecularMethod::Fisher] {
            assert_eq!(m.to_string().parse::<SecularMethod>().unwrap(), m);
        }
        assert!("gad".parse::<SecularMethod>().is_err());
    }

    #[test]
    fn test_secular_kappa() {
        let p = params(1, 10).with_secular(SecularMethod::Fisher, Some(42.0)).unwrap();
        assert_eq!(p.secular_kappa().unwrap(), 42.0);
        let g = params(1, 10).with_secular(SecularMethod::G, None).unwrap();
        let tk = params(1, 10);
        assert_eq!(g.secular_kappa().unwrap(), tk.secular_kappa().unwrap());
    }

    #[test]
    fn test_samples_partition_and_order() {
        let p = SamplingParams::new(40.0, -20.0, 100.0, 0.3, 4, 18).unwrap();
        let mut rng = create_rng(1);
        let table = generate_samples(&p, &mut rng).unwrap();
        assert_eq!(table.len(), 18);

        let design = generate_design(&p);
        for (site, &nk) in design.iter().enumerate() {
            let rows: Vec<_> = table.iter().filter(|r| r.site == site).collect();
            assert_eq!(rows.len(), nk);
            // In-liers first, outliers last.
            assert!(rows.windows(2).all(|w| w[0].is_outlier <= w[1].is_outlier));
        }
        assert!(table.rows.windows(2).all(|w| w[0].site <= w[1].site));
    }

    #[test]
    fn test_inlier_vgps_match_directions() {
        let p = SamplingParams::new(40.0, 45.0, 30.0, 0.5, 5, 50).unwrap();
        let mut rng = create_rng(2);
        let table = generate_samples(&p, &mut rng).unwrap();
        for row in table.iter() {
            let vgp = direction_to_vgp(&row.direction(), p.site_lat, p.site_long);
            assert!(vgp.distance_to(&row.vgp()) < 1e-4, "{row:?}");
        }
    }

    #[test]
    fn test_no_outliers_at_zero_rate() {
        let mut rng = create_rng(3);
        let table = generate_samples(&params(5, 50), &mut rng).unwrap();
        assert_eq!(table.n_outliers(), 0);
    }

    #[test]
    fn test_all_outliers_at_unit_rate() {
        let p = SamplingParams::new(50.0, 30.0, 10.0, 1.0, 2, 20).unwrap();
        let mut rng = create_rng(4);
        let table = generate_samples(&p, &mut rng).unwrap();
        assert_eq!(table.n_outliers(), 20);
    }

    #[test]
    fn test_high_kappa_sites_are_tight() {
        let p = SamplingParams::new(1e4, 30.0, 0.0, 0.0, 6, 30).unwrap();
        let mut rng = create_rng(5);
        let table = generate_samples(&p, &mut rng).unwrap();
        for site in 0..5 {
            let dirs: Vec<_> = table.iter().filter(|r| r.site == site).map(|r| r.direction()).collect();
            assert!(dirs.iter().all(|d| d.angle_to(&dirs[0]) < 5.0));
        }
    }

    #[test]
    fn test_fisher_secular_vgps_near_pole() {
        let p = SamplingParams::new(1e4, 30.0, 0.0, 0.0, 1, 500)
            .unwrap()
            .with_secular(SecularMethod::Fisher, Some(200.0))
            .unwrap();
        let mut rng = create_rng(6);
        let table = generate_samples(&p, &mut rng).unwrap();
        assert!(table.iter().all(|r| r.vgp_lat > 65.0));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let p = params(3, 30);
        let a = generate_samples(&p, &mut create_rng(9)).unwrap();
        let b = generate_samples(&p, &mut create_rng(9)).unwrap();
        assert_eq!(a, b);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn design_partitions_total(n0 in 1_usize..20, n_sites in 1_usize..40, extra in 0_usize..40) {
            let total = n0 * n_sites + extra.min(n_sites).min(n0 - 1);
            let params = SamplingParams::new(50.0, 0.0, 0.0, 0.0, n0, total).unwrap();
            let design = generate_design(&params);
            prop_assert_eq!(design.iter().sum::<usize>(), total);
            prop_assert!(design.iter().all(|&n| n == n0 || n == n0 + 1));
            prop_assert!(design.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
