//! # smpsite
//!
//! Monte Carlo evaluation of paleomagnetic sampling designs.
//!
//! A design spreads a fixed number of specimens over sites. For each trial
//! the crate synthesizes specimen directions under a secular-variation
//! model, estimates the paleomagnetic pole from site-mean VGPs, and splits
//! the VGP scatter into within-site and between-site parts. Repeating the
//! trial yields the error distribution of the pole and of the scatter
//! estimate for that design.
//!
//! ## Modules
//!
//! - [`kappa`]: Model G dispersion, `κ ↔ S` table, latitude correction
//! - [`sampling`]: sampling parameters, design, specimen tables
//! - [`estimate`]: pole estimation, batch driver, batch summary
//! - [`pmag`]: directions, VGP transforms, Fisher mean, Vandamme cutoff, TK03
//! - [`distributions`]: Fisher and uniform-sphere sampling
//! - [`stats`]: descriptive statistics with numerical stability guarantees
//! - [`random`]: seeded generators
//! - [`config`] / [`output`]: TOML run files and CSV tables
//!
//! ## Example
//!
//! ```
//! use smpsite::estimate::{simulate_estimations, summarize_batch, SimulationOptions};
//! use smpsite::sampling::SamplingParams;
//!
//! let params = SamplingParams::new(50.0, 30.0, 0.0, 0.0, 5, 50).unwrap();
//! let options = SimulationOptions { n_iters: 10, seed: Some(7), ..Default::default() };
//! let batch = simulate_estimations(&params, &options).unwrap();
//! let summary = summarize_batch(&batch).unwrap();
//! assert_eq!(summary.total_simulations, 10);
//! ```
//!
//! ## Design Philosophy
//!
//! - **Explicit randomness**: every sampler takes `&mut R: Rng`; a batch
//!   seeds one generator
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Kahan summation for accumulation
//! - **Property-based testing**: invariants verified via proptest

pub mod config;
pub mod distributions;
pub mod error;
pub mod estimate;
pub mod kappa;
pub mod output;
pub mod pmag;
pub mod random;
pub mod sampling;
pub mod stats;

pub use config::{ConfigError, SimulationConfig};
pub use error::{Result, SmpsiteError};
pub use estimate::{
    estimate_pole, simulate_estimations, summarize_batch, BatchSummary, EstimateOutcome,
    OutlierPolicy, PoleEstimate, SimulationBatch, SimulationOptions,
};
pub use sampling::{generate_design, generate_samples, SamplingParams, SecularMethod};
