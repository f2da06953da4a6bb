//! Vandamme (1994) iterative cutoff for VGP outliers.
//!
//! With `Δ = 90 − vgp_lat` the colatitude of each VGP:
//! ```text
//! ASD = √(ΣΔ² / (N − 1))
//! A   = 1.8 · ASD + 5
//! ```
//! While the largest `Δ` exceeds `A`, the VGP(s) at that maximum are
//! dropped and `ASD`, `A` are recomputed on the survivors.
//!
//! Reference: Vandamme (1994), "A new method to determine paleosecular
//! variation", *Phys. Earth Planet. Inter.* 85.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::direction::Pole;

/// Result of the Vandamme cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VandammeCutoff {
    /// Indices (into the input slice) of the retained VGPs, ascending.
    pub kept: Vec<usize>,
    /// Final cutoff angle `A` (degrees).
    pub cutoff: f64,
    /// Final angular standard deviation of the retained VGPs (degrees).
    pub asd: f64,
}

fn angular_std(colatitudes: &[f64]) -> f64 {
    let n = colatitudes.len();
    let ss: f64 = colatitudes.iter().map(|d| d * d).sum();
    (ss / (n.saturating_sub(1).max(1)) as f64).sqrt()
}

/// Applies the Vandamme cutoff to `vgps`.
///
/// At least two VGPs always survive; with fewer than three inputs nothing
/// is removed.
pub fn vandamme_cutoff(vgps: &[Pole]) -> VandammeCutoff {
    let mut kept: Vec<usize> = (0..vgps.len()).collect();
    let colat = |i: &usize| 90.0 - vgps[*i].lat;

    loop {
        let deltas: Vec<f64> = kept.iter().map(colat).collect();
        let asd = angular_std(&deltas);
        let cutoff = 1.8 * asd + 5.0;
        let delta_max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if kept.len() < 3 || delta_max <= cutoff {
            return VandammeCutoff { kept, cutoff, asd };
        }

        let previous = kept.clone();
        kept.retain(|i| colat(i) < delta_max);
        debug!(
            removed = previous.len() - kept.len(),
            cutoff,
            delta_max,
            "Vandamme iteration"
        );
        if kept.len() < 2 {
            // Every survivor tied at the maximum.
            return VandammeCutoff {
                kept: previous,
                cutoff,
                asd,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring(colatitudes: &[f64]) -> Vec<Pole> {
        colatitudes
            .iter()
            .enumerate()
            .map(|(i, c)| Pole::new(i as f64 * 30.0, 90.0 - c))
            .collect()
    }

    #[test]
    fn test_tight_cluster_untouched() {
        let vgps = ring(&[5.0, 8.0, 10.0, 12.0, 6.0]);
        let result = vandamme_cutoff(&vgps);
        assert_eq!(result.kept, vec![0, 1, 2, 3, 4]);
        let expected_asd = ((25.0 + 64.0 + 100.0 + 144.0 + 36.0) / 4.0_f64).sqrt();
        assert_relative_eq!(result.asd, expected_asd, epsilon = 1e-12);
        assert_relative_eq!(result.cutoff, 1.8 * expected_asd + 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_far_outlier_removed() {
        let mut colats = vec![10.0; 10];
        colats.push(120.0);
        let result = vandamme_cutoff(&ring(&colats));
        assert_eq!(result.kept, (0..10).collect::<Vec<_>>());
        assert_relative_eq!(result.asd, (1000.0 / 9.0_f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_iterates_until_stable() {
        let colats = [4.0, 5.0, 6.0, 5.0, 4.0, 6.0, 5.0, 30.0, 60.0];
        let result = vandamme_cutoff(&ring(&colats));
        assert_eq!(result.kept, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(result.cutoff > 6.0);
    }

    #[test]
    fn test_small_inputs_untouched() {
        assert_eq!(vandamme_cutoff(&ring(&[1.0, 170.0])).kept, vec![0, 1]);
        assert_eq!(vandamme_cutoff(&ring(&[3.0])).kept, vec![0]);
        assert!(vandamme_cutoff(&[]).kept.is_empty());
    }
}
