//! Distance-rule clustering: a single left-to-right scan per
//! (chromosome, strand) partition, starting a new cluster whenever the
//! gap to the previous included position exceeds `max_dist`.

use cagers_core::models::{PartitionKey, Site, TagCluster};

use crate::cluster::build_cluster;
use crate::config::ClusteringConfig;

/// Cluster one partition's included sites. `sites` must be non-empty and
/// sorted by ascending position.
///
/// Guarantees over the output:
/// - consecutive member gaps within one cluster are ≤ `max_dist`,
/// - the gap between the last member of one cluster and the first member
///   of the next is strictly greater than `max_dist`.
pub(crate) fn cluster_partition(
    sample: &str,
    partition: &PartitionKey,
    sites: &[Site],
    cfg: &ClusteringConfig,
) -> Vec<TagCluster> {
    let mut clusters = Vec::new();
    let mut begin = 0;

    for i in 1..sites.len() {
        if sites[i].pos - sites[i - 1].pos > cfg.max_dist {
            clusters.push(build_cluster(sample, partition, &sites[begin..i]));
            begin = i;
        }
    }
    clusters.push(build_cluster(sample, partition, &sites[begin..]));

    clusters
}
