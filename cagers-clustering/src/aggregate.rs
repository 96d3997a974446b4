//! Cross-sample aggregation: merge every sample's tag-cluster intervals
//! into disjoint consensus clusters, then re-project each sample's
//! signal over the consensus intervals into a dense matrix.

use std::collections::BTreeMap;

use cagers_core::errors::CageError;
use cagers_core::models::{
    ConsensusCluster, PartitionKey, SignalMatrix, SignalStore, TagCluster,
};

use crate::config::{AggregationConfig, QuantileConfig};
use crate::profile::{CumulativeProfile, QuantileWidth, interquantile_width};

/// Merge all samples' tag clusters into consensus clusters.
///
/// Per (chromosome, strand): sort intervals by start and sweep, merging
/// any two separated by at most `cfg.max_dist` (inclusive: a gap of
/// exactly `max_dist` merges; overlap and touching always merge). Each
/// input cluster lands in exactly one consensus cluster — the one whose
/// union it contributed to. Ids are assigned in (chromosome, strand,
/// start) order, so the output is identical for any worker count.
pub fn aggregate_tag_clusters(
    clusters_by_sample: &[Vec<TagCluster>],
    cfg: &AggregationConfig,
) -> Vec<ConsensusCluster> {
    let mut by_partition: BTreeMap<PartitionKey, Vec<&TagCluster>> = BTreeMap::new();
    for sample_clusters in clusters_by_sample {
        for cluster in sample_clusters {
            by_partition
                .entry(PartitionKey::new(&cluster.chr, cluster.strand))
                .or_default()
                .push(cluster);
        }
    }

    let mut consensus = Vec::new();
    let mut next_id: u32 = 0;

    for (key, mut members) in by_partition {
        members.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(a.end.cmp(&b.end))
                .then(a.sample.cmp(&b.sample))
        });

        let mut iter = members.into_iter();
        let first = match iter.next() {
            Some(first) => first,
            None => continue,
        };
        let mut start = first.start;
        let mut end = first.end;
        let mut contributors = vec![first.clone()];

        for cluster in iter {
            if cluster.start <= end.saturating_add(cfg.max_dist) {
                end = end.max(cluster.end);
                contributors.push(cluster.clone());
            } else {
                consensus.push(ConsensusCluster {
                    id: next_id,
                    chr: key.chr.clone(),
                    strand: key.strand,
                    start,
                    end,
                    contributors: std::mem::take(&mut contributors),
                });
                next_id += 1;
                start = cluster.start;
                end = cluster.end;
                contributors.push(cluster.clone());
            }
        }
        consensus.push(ConsensusCluster {
            id: next_id,
            chr: key.chr.clone(),
            strand: key.strand,
            start,
            end,
            contributors,
        });
        next_id += 1;
    }

    consensus
}

/// Project every sample's signal over the consensus intervals.
///
/// The projection runs against the full CTSS signal of the interval, not
/// just tag-cluster members, so a sample contributes even where its own
/// clustering called nothing. A (sample, cluster) pair with zero signal
/// is a defined 0.0 entry — the matrix is dense. With
/// `exclude_signal_below_threshold` set, contributions below
/// `tpm_threshold` are zeroed before storing.
pub fn consensus_signal_matrix<S: SignalStore>(
    store: &S,
    consensus: &[ConsensusCluster],
    cfg: &AggregationConfig,
) -> SignalMatrix {
    let n_samples = store.samples().len();
    let mut matrix = SignalMatrix::new(n_samples, consensus.len());

    for (col, cluster) in consensus.iter().enumerate() {
        let key = PartitionKey::new(&cluster.chr, cluster.strand);
        for row in 0..n_samples {
            let sample = &store.samples()[row];
            let sites = store.sites_in(row, &key, cluster.start, cluster.end);
            let total = CumulativeProfile::build(sample, cluster.strand, &sites)
                .map(|p| p.total_tpm())
                .unwrap_or(0.0);
            let total = if cfg.exclude_signal_below_threshold && total < cfg.tpm_threshold {
                0.0
            } else {
                total
            };
            // rows and cols come from the same lengths the matrix was
            // sized with
            let _ = matrix.set(row, col, total);
        }
    }

    matrix
}

/// Interquantile widths of every (consensus cluster, sample) pair with
/// signal. Pairs with zero signal are skipped — sparse per-sample
/// coverage is expected, and fabricating a width row for it would be
/// worse than omitting it.
pub fn consensus_quantile_widths<S: SignalStore>(
    store: &S,
    consensus: &[ConsensusCluster],
    q: &QuantileConfig,
) -> Result<Vec<QuantileWidth>, CageError> {
    q.validate()?;

    let mut widths = Vec::new();
    for cluster in consensus {
        let key = PartitionKey::new(&cluster.chr, cluster.strand);
        for (row, sample) in store.samples().iter().enumerate() {
            let sites = store.sites_in(row, &key, cluster.start, cluster.end);
            match interquantile_width(
                sample,
                &cluster.chr,
                cluster.strand,
                cluster.start,
                cluster.end,
                &sites,
                q,
            ) {
                Ok(width) => widths.push(width),
                Err(CageError::Data { .. }) => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(widths)
}
