use cagers_core::errors::CageError;
use cagers_core::models::{PartitionKey, SignalStore, Site, TagCluster};

use crate::config::{ClusterMethod, ClusteringConfig};
use crate::{distclu, paraclu};

/// Cluster one sample's included CTSS positions into tag clusters.
///
/// Dispatches on `cfg.method`; both strategies honor the same contract:
/// non-overlapping clusters per (chromosome, strand), members sorted
/// ascending, dominant position resolved by maximal signal with ties to
/// the lowest coordinate. Partitions are visited in deterministic order,
/// so the output is reproducible regardless of scheduling.
///
/// Errors with [`CageError::Data`] when no position of the sample passes
/// the inclusion filter; the caller decides whether that is fatal.
pub fn cluster_sample<S: SignalStore>(
    store: &S,
    sample_idx: usize,
    cfg: &ClusteringConfig,
) -> Result<Vec<TagCluster>, CageError> {
    let sample = store
        .samples()
        .get(sample_idx)
        .cloned()
        .ok_or_else(|| {
            CageError::Configuration(format!("sample index {} out of range", sample_idx))
        })?;

    let mut clusters = Vec::new();
    let mut saw_included = false;

    for partition in store.partitions() {
        let sites: Vec<Site> = store
            .sites(sample_idx, &partition)
            .into_iter()
            .filter(|s| s.included)
            .collect();
        if sites.is_empty() {
            continue;
        }
        saw_included = true;

        let partition_clusters = match cfg.method {
            ClusterMethod::Distclu => distclu::cluster_partition(&sample, &partition, &sites, cfg),
            ClusterMethod::Paraclu => paraclu::cluster_partition(&sample, &partition, &sites, cfg),
        };
        clusters.extend(partition_clusters);
    }

    if !saw_included {
        return Err(CageError::Data {
            sample,
            reason: "no CTSS positions pass the inclusion filter".to_string(),
        });
    }

    if cfg.remove_singletons {
        clusters.retain(|c| !c.is_singleton() || c.tpm > cfg.keep_singletons_above);
    }

    Ok(clusters)
}

/// Assemble a [`TagCluster`] from member sites. `members` must be
/// non-empty and sorted by ascending position.
pub(crate) fn build_cluster(
    sample: &str,
    partition: &PartitionKey,
    members: &[Site],
) -> TagCluster {
    debug_assert!(!members.is_empty());

    // strictly-greater keeps the lowest coordinate on ties
    let mut dominant = &members[0];
    for site in &members[1..] {
        if site.tpm > dominant.tpm {
            dominant = site;
        }
    }

    TagCluster {
        chr: partition.chr.clone(),
        strand: partition.strand,
        start: members[0].pos,
        end: members[members.len() - 1].pos + 1,
        sample: sample.to_string(),
        positions: members.iter().map(|s| s.pos).collect(),
        count: members.iter().map(|s| s.count).sum(),
        tpm: members.iter().map(|s| s.tpm).sum(),
        dominant_pos: dominant.pos,
        dominant_tpm: dominant.tpm,
    }
}
