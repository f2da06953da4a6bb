//! CSV writers for batch and summary tables.
//!
//! One header row, then one line per record. Undefined values (`None`)
//! are written as empty fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SmpsiteError};
use crate::estimate::{BatchSummary, SimulationBatch};

const BATCH_HEADER: &str = "plong,plat,error_angle,S2_vgp,S2_within,S2_total,total_samples,\
samples_per_site,n_sites_used,S2_vgp_real,n_tot,n_sites,kappa_within_site,site_lat,site_long,\
outlier_rate,secular_method,kappa_secular,outlier_policy";

const SUMMARY_HEADER: &str = "error_angle_mean,error_angle_std,error_angle_5,error_angle_25,\
error_angle_50,error_angle_75,error_angle_95,error_angle_S2,error_angle_S,error_vgp_scatter,\
S2_vgp_real,n_tot,n_sites,samples_per_site,kappa_within_site,site_lat,site_long,outlier_rate,\
secular_method,kappa_secular,outlier_policy,total_simulations";

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes one line per trial.
pub fn write_batch<W: Write>(mut w: W, batch: &SimulationBatch) -> std::io::Result<()> {
    writeln!(w, "{BATCH_HEADER}")?;
    for r in batch.iter() {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            r.plong,
            r.plat,
            r.error_angle,
            opt(r.s2_vgp),
            r.s2_within,
            opt(r.s2_total),
            r.total_samples,
            r.samples_per_site,
            r.n_sites_used,
            r.s2_vgp_real,
            r.n_tot,
            r.n_sites,
            r.kappa_within_site,
            r.site_lat,
            r.site_long,
            r.outlier_rate,
            r.secular_method,
            opt(r.kappa_secular),
            r.outlier_policy,
        )?;
    }
    Ok(())
}

/// Writes one line per summary.
pub fn write_summaries<W: Write>(mut w: W, summaries: &[BatchSummary]) -> std::io::Result<()> {
    writeln!(w, "{SUMMARY_HEADER}")?;
    for s in summaries {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            s.error_angle_mean,
            s.error_angle_std,
            s.error_angle_5,
            s.error_angle_25,
            s.error_angle_50,
            s.error_angle_75,
            s.error_angle_95,
            s.error_angle_s2,
            s.error_angle_s,
            opt(s.error_vgp_scatter),
            s.s2_vgp_real,
            s.n_tot,
            s.n_sites,
            s.samples_per_site,
            s.kappa_within_site,
            s.site_lat,
            s.site_long,
            s.outlier_rate,
            s.secular_method,
            opt(s.kappa_secular),
            s.outlier_policy,
            s.total_simulations,
        )?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| SmpsiteError::Io {
            context: format!("creating {}", path.display()),
            source,
        })
}

/// Write a simulation batch to a CSV file.
pub fn write_batch_csv(path: &Path, batch: &SimulationBatch) -> Result<()> {
    let mut w = create(path)?;
    write_batch(&mut w, batch)
        .and_then(|()| w.flush())
        .map_err(|source| SmpsiteError::Io {
            context: format!("writing {}", path.display()),
            source,
        })
}

/// Write batch summaries to a CSV file.
pub fn write_summary_csv(path: &Path, summaries: &[BatchSummary]) -> Result<()> {
    let mut w = create(path)?;
    write_summaries(&mut w, summaries)
        .and_then(|()| w.flush())
        .map_err(|source| SmpsiteError::Io {
            context: format!("writing {}", path.display()),
            source,
        })
}
