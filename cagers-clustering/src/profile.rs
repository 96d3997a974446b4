//! Cumulative signal curves and quantile-based width statistics.
//!
//! For one cluster interval and one sample, the builder walks the
//! member positions 5′→3′ of the transcript (ascending on `+`,
//! descending on `-`), accumulates normalized signal, and scales it to a
//! running fraction of the total. Quantile positions resolve per-base:
//! the first traversed position whose fraction reaches or exceeds the
//! quantile, with no interpolation between bases.

use cagers_core::errors::CageError;
use cagers_core::models::{Site, Strand};

use crate::config::QuantileConfig;

/// Strand-oriented cumulative signal curve of one cluster in one
/// sample. Ephemeral: recomputed whenever a cluster's signal shape is
/// needed, never stored on the cluster itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeProfile {
    /// Genomic positions in traversal order.
    positions: Vec<u32>,
    /// Offsets from the 5′-most traversed position, parallel to
    /// `positions`.
    offsets: Vec<u32>,
    /// Running fraction of total signal; non-decreasing, ends at 1
    /// within floating tolerance.
    fractions: Vec<f64>,
    total: f64,
}

impl CumulativeProfile {
    /// Build the curve from a cluster's member sites (ascending genomic
    /// order, as the signal store yields them).
    ///
    /// Errors with [`CageError::Data`] when the interval holds no signal
    /// for the sample — callers skip such units rather than crash, since
    /// sparse per-sample coverage of a consensus cluster is expected.
    pub fn build(sample: &str, strand: Strand, sites: &[Site]) -> Result<Self, CageError> {
        let total: f64 = sites.iter().map(|s| s.tpm).sum();
        if sites.is_empty() || total <= 0.0 {
            return Err(CageError::Data {
                sample: sample.to_string(),
                reason: "zero total signal in cluster interval".to_string(),
            });
        }

        let mut ordered: Vec<&Site> = sites.iter().collect();
        if strand == Strand::Minus {
            ordered.reverse();
        }
        let five_prime = ordered[0].pos;

        let mut positions = Vec::with_capacity(ordered.len());
        let mut offsets = Vec::with_capacity(ordered.len());
        let mut fractions = Vec::with_capacity(ordered.len());
        let mut running = 0.0;
        for site in ordered {
            running += site.tpm;
            positions.push(site.pos);
            offsets.push(site.pos.abs_diff(five_prime));
            fractions.push(running / total);
        }

        Ok(CumulativeProfile {
            positions,
            offsets,
            fractions,
            total,
        })
    }

    /// Total normalized signal over the interval.
    pub fn total_tpm(&self) -> f64 {
        self.total
    }

    /// `(relative_position, cumulative_fraction)` pairs in traversal
    /// order.
    pub fn points(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.offsets
            .iter()
            .copied()
            .zip(self.fractions.iter().copied())
    }

    /// Genomic position at which the cumulative fraction first reaches
    /// or exceeds `q`. Falls back to the 3′-most position when rounding
    /// leaves the final fraction a hair under `q`.
    pub fn quantile_position(&self, q: f64) -> u32 {
        let idx = self
            .fractions
            .iter()
            .position(|f| *f >= q)
            .unwrap_or(self.fractions.len() - 1);
        self.positions[idx]
    }
}

/// Interquantile width of one cluster in one sample. Quantile positions
/// are genomic coordinates with `q_low_pos <= q_up_pos` regardless of
/// strand, so `width` is never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileWidth {
    pub chr: String,
    pub strand: Strand,
    pub sample: String,
    pub cluster_start: u32,
    pub cluster_end: u32,
    pub q_low_pos: u32,
    pub q_up_pos: u32,
}

impl QuantileWidth {
    /// Zero exactly when the cluster has a single contributing position
    /// or both quantiles resolve to the same base.
    pub fn width(&self) -> u32 {
        self.q_up_pos - self.q_low_pos
    }
}

/// Compute the interquantile width for one sample's sites within a
/// cluster interval `[start, end)`.
pub fn interquantile_width(
    sample: &str,
    chr: &str,
    strand: Strand,
    start: u32,
    end: u32,
    sites: &[Site],
    q: &QuantileConfig,
) -> Result<QuantileWidth, CageError> {
    q.validate()?;

    let profile = CumulativeProfile::build(sample, strand, sites)?;
    let a = profile.quantile_position(q.q_low);
    let b = profile.quantile_position(q.q_up);

    Ok(QuantileWidth {
        chr: chr.to_string(),
        strand,
        sample: sample.to_string(),
        cluster_start: start,
        cluster_end: end,
        q_low_pos: a.min(b),
        q_up_pos: a.max(b),
    })
}
