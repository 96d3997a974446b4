use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::models::ctss::Strand;

/// A within-sample cluster of CTSS positions: a contiguous genomic
/// interval `[start, end)` grouped by signal proximity or density.
///
/// Invariants, maintained by the clusterer that creates it:
/// - `start <= p < end` for every member position,
/// - `positions` is sorted ascending,
/// - within one sample's output, clusters on the same strand never
///   overlap and are separated by more than the clustering distance.
///
/// Never mutated after creation; reclustering with new parameters
/// produces a new set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TagCluster {
    pub chr: String,
    pub strand: Strand,
    pub start: u32,
    pub end: u32,
    /// Name of the sample the cluster was called in.
    pub sample: String,
    /// Member CTSS positions, ascending.
    pub positions: Vec<u32>,
    /// Total raw tag count over the members.
    pub count: u32,
    /// Total normalized signal over the members.
    pub tpm: f64,
    /// Member position with the highest normalized signal; ties resolve
    /// to the lowest genomic coordinate.
    pub dominant_pos: u32,
    /// Normalized signal at the dominant position.
    pub dominant_tpm: f64,
}

impl TagCluster {
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_singleton(&self) -> bool {
        self.positions.len() == 1
    }

    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chr, self.start, self.end, self.strand, self.sample, self.tpm, self.dominant_pos
        )
    }
}

impl Display for TagCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
