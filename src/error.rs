//! Error types for smpsite.
//!
//! Three kinds of failure exist in this crate:
//! - Caller errors: unknown selector strings, invalid parameters,
//!   lookups outside the tabulated range. Returned as [`SmpsiteError`].
//! - The empty-group anomaly during estimation. Not an error: it is the
//!   [`EstimateOutcome::Empty`](crate::estimate::EstimateOutcome::Empty)
//!   branch, retried by the batch driver.
//! - Internal invariant violations (partition sums, negative within-site
//!   concentration). These are `assert!`s and abort.

use thiserror::Error;

use crate::config::ConfigError;
use crate::distributions::DistributionError;

/// Top-level error type for smpsite.
#[derive(Debug, Error)]
pub enum SmpsiteError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Value {value} outside tabulated range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Batch column '{column}' is not constant; one summary covers one configuration")]
    InconsistentBatch { column: &'static str },

    #[error("Cannot summarize an empty batch")]
    EmptyBatch,

    #[error("Gave up after {attempts} consecutive empty-group trials")]
    RetriesExhausted { attempts: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SmpsiteError>;
