//! Pole estimation and the Monte Carlo batch driver.
//!
//! One trial: group a [`SampleTable`] by site, Fisher-average each site,
//! convert site means to VGPs, optionally apply the Vandamme cutoff, and
//! decompose the VGP scatter into total and within-site parts (`N_sites`
//! is the design's site count, the sum runs over retained sites):
//! ```text
//! S²_total  = Σ Δᵢ² / (N_sites − 1)      Δᵢ = distance(VGPᵢ, mean pole)
//! S²_within = mean over sites of S²_wᵢ / nᵢ
//! S²_vgp    = S²_total − S²_within
//! ```
//! [`simulate_estimations`] repeats trials into a [`SimulationBatch`];
//! [`summarize_batch`] reduces a batch to one [`BatchSummary`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SmpsiteError};
use crate::kappa::{kappa2angular, latitude_correction, AngleUnit};
use crate::pmag::{
    direction_to_vgp, fisher_mean, great_circle_distance, vandamme_cutoff, Direction, Pole,
    VandammeCutoff,
};
use crate::random::rng_from_seed;
use crate::sampling::{generate_samples, SampleTable, SamplingParams, SecularMethod};
use crate::stats::{mean, mean_square, Describe};

// ============================================================================
// Outlier policy
// ============================================================================

/// How outliers are handled before the pole is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierPolicy {
    /// Drop specimens flagged as outliers before grouping by site.
    DiscardFlagged,
    /// Use every specimen.
    #[default]
    KeepAll,
    /// Use every specimen, then apply the Vandamme cutoff to site VGPs.
    Vandamme,
}

impl FromStr for OutlierPolicy {
    type Err = SmpsiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discard-flagged" => Ok(OutlierPolicy::DiscardFlagged),
            "keep-all" => Ok(OutlierPolicy::KeepAll),
            "vandamme" => Ok(OutlierPolicy::Vandamme),
            other => Err(SmpsiteError::InvalidArgument(format!(
                "unknown outlier policy '{other}' (expected 'discard-flagged', 'keep-all' or 'vandamme')"
            ))),
        }
    }
}

impl fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutlierPolicy::DiscardFlagged => "discard-flagged",
            OutlierPolicy::KeepAll => "keep-all",
            OutlierPolicy::Vandamme => "vandamme",
        })
    }
}

// ============================================================================
// Per-site statistics
// ============================================================================

/// Fisher mean direction and resultant length of one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteMean {
    pub dec: f64,
    pub inc: f64,
    pub n_samples: usize,
    pub resultant_length: f64,
}

impl SiteMean {
    pub fn direction(&self) -> Direction {
        Direction::new(self.dec, self.inc)
    }
}

/// Fisher mean of one site's directions.
///
/// A single direction is returned unchanged with resultant length 1.
///
/// # Returns
/// - `None` for an empty slice; callers report it as
///   [`EstimateOutcome::Empty`].
///
/// # Examples
/// ```
/// use smpsite::estimate::robust_fisher_mean;
/// use smpsite::pmag::Direction;
/// let m = robust_fisher_mean(&[Direction::new(12.0, 34.0)]).unwrap();
/// assert_eq!((m.dec, m.inc, m.resultant_length), (12.0, 34.0, 1.0));
/// assert!(robust_fisher_mean(&[]).is_none());
/// ```
pub fn robust_fisher_mean(directions: &[Direction]) -> Option<SiteMean> {
    if let [only] = directions {
        return Some(SiteMean {
            dec: only.dec,
            inc: only.inc,
            n_samples: 1,
            resultant_length: 1.0,
        });
    }
    let m = fisher_mean(directions)?;
    Some(SiteMean {
        dec: m.dec,
        inc: m.inc,
        n_samples: m.n,
        resultant_length: m.r,
    })
}

/// Within-site VGP dispersion (degrees²) of a site with `n_samples`
/// directions and resultant length `resultant_length`:
/// `2 · (180/π)² · latitude_correction(λ) / k` with `k = (n − 1)/(n − R)`.
///
/// Single-sample sites contribute zero.
///
/// # Panics
/// Panics if `resultant_length` is outside `[0, n_samples]` or the
/// estimated `k` is negative.
pub fn within_site_dispersion(
    resultant_length: f64,
    n_samples: usize,
    latitude: f64,
    unit: AngleUnit,
) -> f64 {
    if n_samples == 1 {
        return 0.0;
    }
    let n = n_samples as f64;
    assert!(
        (0.0..=n).contains(&resultant_length),
        "resultant length {resultant_length} outside [0, {n_samples}]"
    );
    let k = (n - 1.0) / (n - resultant_length);
    assert!(k >= 0.0, "negative within-site concentration k = {k}");
    2.0 * (180.0 / std::f64::consts::PI).powi(2) * latitude_correction(latitude, unit) / k
}

/// Statistics of one site in one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub site: usize,
    /// Site-mean direction.
    pub dec: f64,
    pub inc: f64,
    pub n_samples: usize,
    pub resultant_length: f64,
    /// Within-site dispersion `S²_w` (degrees²).
    pub s2_within: f64,
    /// `S²_w / n_samples`.
    pub s2_within_norm: f64,
    pub vgp_lon: f64,
    pub vgp_lat: f64,
}

impl SiteSummary {
    pub fn vgp(&self) -> Pole {
        Pole::new(self.vgp_lon, self.vgp_lat)
    }
}

// ============================================================================
// Pole estimate
// ============================================================================

/// Result of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleEstimate {
    /// Fisher mean of the retained site VGPs.
    pub pole: Pole,
    /// Between-site VGP scatter `S²_total − S²_within`; `None` when the
    /// design has a single site.
    pub s2_vgp: Option<f64>,
    /// `Σ Δᵢ²` over retained sites divided by the design's `N_sites − 1`.
    pub s2_total: Option<f64>,
    /// Pooled within-site term, averaged over all sites before any cutoff.
    pub s2_within: f64,
    /// Specimens in the retained sites.
    pub total_samples: usize,
    pub samples_per_site: usize,
    pub n_sites_used: usize,
    /// Set when the Vandamme policy ran.
    pub vandamme: Option<VandammeCutoff>,
    pub sites: Vec<SiteSummary>,
}

impl PoleEstimate {
    /// Angular distance of the pole from the spin axis, `90 − plat`.
    pub fn error_angle(&self) -> f64 {
        90.0 - self.pole.lat
    }
}

/// Why a trial produced no estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Every specimen was discarded, so no site group holds a direction.
    NoSites,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoSites => f.write_str("no site survived outlier filtering"),
        }
    }
}

/// Outcome of [`estimate_pole`].
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateOutcome {
    Estimated(PoleEstimate),
    Empty { reason: EmptyReason },
}

/// Estimates the paleomagnetic pole and its dispersion from one table.
///
/// Sites are the distinct site indices present after filtering; a site
/// whose specimens were all discarded is simply absent.
///
/// # Errors
/// `InvalidArgument` if `params` is invalid.
pub fn estimate_pole(
    table: &SampleTable,
    params: &SamplingParams,
    policy: OutlierPolicy,
) -> Result<EstimateOutcome> {
    params.validate()?;

    let mut groups: BTreeMap<usize, Vec<Direction>> = BTreeMap::new();
    for row in table.iter() {
        if policy == OutlierPolicy::DiscardFlagged && row.is_outlier {
            continue;
        }
        groups.entry(row.site).or_default().push(row.direction());
    }
    if groups.is_empty() {
        return Ok(EstimateOutcome::Empty {
            reason: EmptyReason::NoSites,
        });
    }

    let mut sites = Vec::with_capacity(groups.len());
    let site_means = groups
        .iter()
        .filter_map(|(site, directions)| Some((*site, robust_fisher_mean(directions)?)));
    for (site, mean) in site_means {
        let s2_within = within_site_dispersion(
            mean.resultant_length,
            mean.n_samples,
            params.site_lat,
            AngleUnit::Degrees,
        );
        let vgp = direction_to_vgp(&mean.direction(), params.site_lat, params.site_long);
        sites.push(SiteSummary {
            site,
            dec: mean.dec,
            inc: mean.inc,
            n_samples: mean.n_samples,
            resultant_length: mean.resultant_length,
            s2_within,
            s2_within_norm: s2_within / mean.n_samples as f64,
            vgp_lon: vgp.lon,
            vgp_lat: vgp.lat,
        });
    }

    let norms: Vec<f64> = sites.iter().map(|s| s.s2_within_norm).collect();
    let s2_within = mean(&norms).unwrap_or(0.0);

    let vandamme = match policy {
        OutlierPolicy::Vandamme => {
            let vgps: Vec<Pole> = sites.iter().map(SiteSummary::vgp).collect();
            let cut = vandamme_cutoff(&vgps);
            sites = cut.kept.iter().map(|&i| sites[i].clone()).collect();
            Some(cut)
        }
        OutlierPolicy::DiscardFlagged | OutlierPolicy::KeepAll => None,
    };

    let vgp_dirs: Vec<Direction> = sites.iter().map(|s| s.vgp().as_direction()).collect();
    let Some(grand) = fisher_mean(&vgp_dirs) else {
        return Ok(EstimateOutcome::Empty {
            reason: EmptyReason::NoSites,
        });
    };
    let pole = Pole::from_direction(&grand.direction());

    // Normalized by the design's site count, not the retained one.
    let n_sites_used = sites.len();
    let design_sites = params.n_sites();
    let s2_total = (design_sites >= 2).then(|| {
        sites
            .iter()
            .map(|s| great_circle_distance(&s.vgp(), &pole).powi(2))
            .sum::<f64>()
            / (design_sites - 1) as f64
    });
    let s2_vgp = s2_total.map(|total| total - s2_within);
    let total_samples = sites.iter().map(|s| s.n_samples).sum();

    debug!(
        plat = pole.lat,
        n_sites_used,
        total_samples,
        ?s2_vgp,
        "Pole estimated"
    );

    Ok(EstimateOutcome::Estimated(PoleEstimate {
        pole,
        s2_vgp,
        s2_total,
        s2_within,
        total_samples,
        samples_per_site: params.samples_per_site,
        n_sites_used,
        vandamme,
        sites,
    }))
}

// ============================================================================
// Batch driver
// ============================================================================

/// Options of one Monte Carlo batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub n_iters: usize,
    pub outlier_policy: OutlierPolicy,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Consecutive empty trials tolerated; `None` retries forever.
    pub max_retries: Option<usize>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            n_iters: 100,
            outlier_policy: OutlierPolicy::default(),
            seed: None,
            max_retries: None,
        }
    }
}

/// One successful trial plus the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    pub plong: f64,
    pub plat: f64,
    pub error_angle: f64,
    pub s2_vgp: Option<f64>,
    pub s2_within: f64,
    pub s2_total: Option<f64>,
    pub total_samples: usize,
    pub samples_per_site: usize,
    pub n_sites_used: usize,
    /// Theoretical VGP scatter of the secular model.
    pub s2_vgp_real: f64,
    pub n_tot: usize,
    pub n_sites: usize,
    pub kappa_within_site: f64,
    pub site_lat: f64,
    pub site_long: f64,
    pub outlier_rate: f64,
    pub secular_method: SecularMethod,
    pub kappa_secular: Option<f64>,
    pub outlier_policy: OutlierPolicy,
}

impl BatchRow {
    fn new(
        estimate: &PoleEstimate,
        params: &SamplingParams,
        policy: OutlierPolicy,
        s2_vgp_real: f64,
    ) -> Self {
        Self {
            plong: estimate.pole.lon,
            plat: estimate.pole.lat,
            error_angle: estimate.error_angle(),
            s2_vgp: estimate.s2_vgp,
            s2_within: estimate.s2_within,
            s2_total: estimate.s2_total,
            total_samples: estimate.total_samples,
            samples_per_site: estimate.samples_per_site,
            n_sites_used: estimate.n_sites_used,
            s2_vgp_real,
            n_tot: params.total_samples,
            n_sites: params.n_sites(),
            kappa_within_site: params.kappa_within_site,
            site_lat: params.site_lat,
            site_long: params.site_long,
            outlier_rate: params.outlier_rate,
            secular_method: params.secular_method,
            kappa_secular: params.kappa_secular,
            outlier_policy: policy,
        }
    }
}

/// Ordered trial rows of one or more batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationBatch {
    pub rows: Vec<BatchRow>,
}

impl SimulationBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchRow> {
        self.rows.iter()
    }

    /// Appends the rows of `other`.
    pub fn extend(&mut self, other: SimulationBatch) {
        self.rows.extend(other.rows);
    }
}

/// Theoretical VGP scatter `S²` (degrees²) of the secular model in `params`.
pub fn theoretical_vgp_scatter(params: &SamplingParams) -> Result<f64> {
    Ok(kappa2angular(params.secular_kappa()?)?.powi(2))
}

/// Runs `options.n_iters` successful trials.
///
/// A trial ending in [`EstimateOutcome::Empty`] is logged and redrawn; it
/// does not count toward `n_iters`.
///
/// # Errors
/// - `InvalidArgument` / `OutOfRange` for invalid parameters.
/// - `RetriesExhausted` when `max_retries` is set and that many
///   consecutive trials come back empty.
pub fn simulate_estimations(
    params: &SamplingParams,
    options: &SimulationOptions,
) -> Result<SimulationBatch> {
    params.validate()?;
    let s2_vgp_real = theoretical_vgp_scatter(params)?;
    let mut rng = rng_from_seed(options.seed);

    info!(
        n_iters = options.n_iters,
        policy = %options.outlier_policy,
        secular = %params.secular_method,
        seed = ?options.seed,
        "Starting simulation batch"
    );

    let mut rows = Vec::with_capacity(options.n_iters);
    let mut consecutive_empty = 0;
    while rows.len() < options.n_iters {
        let table = generate_samples(params, &mut rng)?;
        match estimate_pole(&table, params, options.outlier_policy)? {
            EstimateOutcome::Estimated(estimate) => {
                consecutive_empty = 0;
                rows.push(BatchRow::new(&estimate, params, options.outlier_policy, s2_vgp_real));
            }
            EstimateOutcome::Empty { reason } => {
                consecutive_empty += 1;
                warn!(trial = rows.len(), %reason, "Empty trial, retrying");
                if options.max_retries.is_some_and(|max| consecutive_empty > max) {
                    return Err(SmpsiteError::RetriesExhausted {
                        attempts: consecutive_empty,
                    });
                }
            }
        }
    }

    info!(trials = rows.len(), "Simulation batch finished");
    Ok(SimulationBatch { rows })
}

// ============================================================================
// Summary
// ============================================================================

/// Error statistics of one batch, plus the configuration echoed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub error_angle_mean: f64,
    /// Sample standard deviation; `NaN` for a single trial.
    pub error_angle_std: f64,
    pub error_angle_5: f64,
    pub error_angle_25: f64,
    pub error_angle_50: f64,
    pub error_angle_75: f64,
    pub error_angle_95: f64,
    /// Mean of squared error angles.
    #[serde(rename = "error_angle_S2")]
    pub error_angle_s2: f64,
    #[serde(rename = "error_angle_S")]
    pub error_angle_s: f64,
    /// RMS of `√S²_vgp − √S²_vgp_real` over trials with a defined `S²_vgp`.
    pub error_vgp_scatter: Option<f64>,
    pub s2_vgp_real: f64,
    pub n_tot: usize,
    pub n_sites: usize,
    pub samples_per_site: usize,
    pub kappa_within_site: f64,
    pub site_lat: f64,
    pub site_long: f64,
    pub outlier_rate: f64,
    pub secular_method: SecularMethod,
    pub kappa_secular: Option<f64>,
    pub outlier_policy: OutlierPolicy,
    pub total_simulations: usize,
}

fn constant<T, F>(rows: &[BatchRow], column: &'static str, field: F) -> Result<T>
where
    T: PartialEq,
    F: Fn(&BatchRow) -> T,
{
    let first = field(&rows[0]);
    if rows[1..].iter().any(|row| field(row) != first) {
        return Err(SmpsiteError::InconsistentBatch { column });
    }
    Ok(first)
}

/// Reduces a batch to its error statistics.
///
/// Negative `S²_vgp` estimates count as zero scatter.
///
/// # Errors
/// - `EmptyBatch` for a batch without rows.
/// - `InconsistentBatch` if any echoed configuration column varies.
pub fn summarize_batch(batch: &SimulationBatch) -> Result<BatchSummary> {
    let rows = batch.rows.as_slice();
    if rows.is_empty() {
        return Err(SmpsiteError::EmptyBatch);
    }

    let n_tot = constant(rows, "n_tot", |r| r.n_tot)?;
    let n_sites = constant(rows, "n_sites", |r| r.n_sites)?;
    let samples_per_site = constant(rows, "samples_per_site", |r| r.samples_per_site)?;
    let kappa_within_site = constant(rows, "kappa_within_site", |r| r.kappa_within_site)?;
    let site_lat = constant(rows, "site_lat", |r| r.site_lat)?;
    let site_long = constant(rows, "site_long", |r| r.site_long)?;
    let outlier_rate = constant(rows, "outlier_rate", |r| r.outlier_rate)?;
    let secular_method = constant(rows, "secular_method", |r| r.secular_method)?;
    let kappa_secular = constant(rows, "kappa_secular", |r| r.kappa_secular)?;
    let outlier_policy = constant(rows, "outlier_policy", |r| r.outlier_policy)?;
    let s2_vgp_real = constant(rows, "s2_vgp_real", |r| r.s2_vgp_real)?;

    let errors: Vec<f64> = rows.iter().map(|r| r.error_angle).collect();
    let describe = Describe::new(&errors).ok_or_else(|| {
        SmpsiteError::InvalidArgument("batch contains non-finite error angles".into())
    })?;
    let error_angle_s2 = mean_square(&errors).unwrap_or(f64::NAN);

    let real = s2_vgp_real.sqrt();
    let scatter_diffs: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.s2_vgp)
        .map(|s2| s2.max(0.0).sqrt() - real)
        .collect();
    let error_vgp_scatter = mean_square(&scatter_diffs).map(f64::sqrt);

    Ok(BatchSummary {
        error_angle_mean: describe.mean,
        error_angle_std: describe.std,
        error_angle_5: describe.p05,
        error_angle_25: describe.p25,
        error_angle_50: describe.median,
        error_angle_75: describe.p75,
        error_angle_95: describe.p95,
        error_angle_s2,
        error_angle_s: error_angle_s2.sqrt(),
        error_vgp_scatter,
        s2_vgp_real,
        n_tot,
        n_sites,
        samples_per_site,
        kappa_within_site,
        site_lat,
        site_long,
        outlier_rate,
        secular_method,
        kappa_secular,
        outlier_policy,
        total_simulations: rows.len(),
    })
}

// ============================================================================
// Tests
// ============================================================================
