use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::models::ctss::Strand;
use crate::models::tag_cluster::TagCluster;

/// A cross-sample merged interval: the union, per chromosome and strand,
/// of every contributing tag-cluster interval, extended across gaps no
/// wider than the aggregation distance. Candidate promoter region.
///
/// Consensus clusters on the same strand never overlap each other, and
/// `id`s are assigned in (chromosome, strand, start) order, so the set is
/// identical regardless of worker count.
///
/// Owns no mutable state after creation: per-sample signal over the
/// interval is a derived projection, recomputed from the signal store
/// rather than stored here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsensusCluster {
    pub id: u32,
    pub chr: String,
    pub strand: Strand,
    pub start: u32,
    pub end: u32,
    /// Every tag cluster whose interval contributed to the union; each
    /// carries the sample it was called in.
    pub contributors: Vec<TagCluster>,
}

impl ConsensusCluster {
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    /// Names of samples with at least one contributing tag cluster,
    /// deduplicated, in sorted order.
    pub fn contributing_samples(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contributors.iter().map(|c| c.sample.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.chr, self.start, self.end, self.strand, self.id
        )
    }
}

impl Display for ConsensusCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn contributor(sample: &str, start: u32, end: u32) -> TagCluster {
        TagCluster {
            chr: "chr1".to_string(),
            strand: Strand::Plus,
            start,
            end,
            sample: sample.to_string(),
            positions: vec![start],
            count: 1,
            tpm: 1.0,
            dominant_pos: start,
            dominant_tpm: 1.0,
        }
    }

    #[test]
    fn test_contributing_samples_dedup_sorted() {
        let consensus = ConsensusCluster {
            id: 0,
            chr: "chr1".to_string(),
            strand: Strand::Plus,
            start: 100,
            end: 200,
            contributors: vec![
                contributor("s2", 150, 160),
                contributor("s1", 100, 120),
                contributor("s2", 180, 200),
            ],
        };
        assert_eq!(consensus.contributing_samples(), vec!["s1", "s2"]);
    }
}
