//! TOML run configuration for the `smpsite` binary.
//!
//! ```toml
//! [params]
//! kappa_within_site = 50.0
//! site_lat = 30.0
//! site_long = 0.0
//! outlier_rate = 0.1
//! samples_per_site = 5
//! total_samples = 100
//! secular_method = "tk03"      # "tk03" | "G" | "fisher"
//! # kappa_secular = 40.0       # required for "fisher"
//!
//! [simulation]                 # optional, every key has a default
//! n_iters = 100
//! outlier_policy = "keep-all"  # "keep-all" | "discard-flagged" | "vandamme"
//! # seed = 42
//! # max_retries = 1000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::estimate::SimulationOptions;
use crate::sampling::SamplingParams;

/// Example configuration printed by `smpsite example`.
pub const EXAMPLE_CONFIG: &str = r#"# smpsite configuration file

[params]
# Fisher concentration of specimens about their site mean
kappa_within_site = 50.0
site_lat = 30.0
site_long = 0.0
# Probability that a specimen is an outlier
outlier_rate = 0.1
samples_per_site = 5
total_samples = 100
# "tk03", "G" or "fisher"
secular_method = "tk03"
# Required when secular_method = "fisher"
# kappa_secular = 40.0

[simulation]
n_iters = 100
# "keep-all", "discard-flagged" or "vandamme"
outlier_policy = "vandamme"
seed = 42
# Give up after this many consecutive empty trials (unbounded if unset)
# max_retries = 1000
"#;

/// A complete run: sampling design plus batch options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub params: SamplingParams,
    #[serde(default)]
    pub simulation: SimulationOptions,
}

impl SimulationConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Loads and validates a run file.
    ///
    /// # Errors
    /// `SmpsiteError::Config` if the file cannot be read or parsed, and the
    /// parameter errors of [`SimulationConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Checks the sampling parameters and the secular model lookup.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.params.secular_kappa()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
