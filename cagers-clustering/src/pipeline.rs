//! The full run: per-sample clustering and profiling on a bounded worker
//! pool, a strict barrier, then cross-sample aggregation.
//!
//! Per-sample tasks are independent and never touch shared mutable
//! state; the signal store is read-only for the whole parallel phase.
//! Results are collected in sample order, so worker count and scheduling
//! never change the output. The first failing task cancels the run and
//! completed-but-unconsumed results are discarded, keeping output sets
//! consistent.

use indicatif::ProgressBar;
use log::{debug, info};
use rayon::prelude::*;

use cagers_core::errors::{CageError, Stage};
use cagers_core::models::{
    ConsensusCluster, PartitionKey, SignalMatrix, SignalStore, Site, TagCluster,
};

use crate::aggregate::{aggregate_tag_clusters, consensus_quantile_widths, consensus_signal_matrix};
use crate::cluster::cluster_sample;
use crate::config::PipelineConfig;
use crate::profile::{QuantileWidth, interquantile_width};

/// Everything one run produces. Tables are ordered by sample (input
/// order) and by genome coordinate; no table is ever partially filled.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Sample names, in input order; row order of `signal_matrix`.
    pub samples: Vec<String>,
    /// One tag-cluster table per sample.
    pub tag_clusters: Vec<Vec<TagCluster>>,
    /// Interquantile widths of every tag cluster with signal.
    pub tag_cluster_widths: Vec<QuantileWidth>,
    /// Consensus clusters in (chromosome, strand, start) order.
    pub consensus_clusters: Vec<ConsensusCluster>,
    /// Interquantile widths of every (consensus cluster, sample) pair
    /// with signal.
    pub consensus_widths: Vec<QuantileWidth>,
    /// Dense sample × consensus-cluster signal matrix.
    pub signal_matrix: SignalMatrix,
}

/// Run the whole pipeline over a signal store.
///
/// Phases:
/// 1. validate configuration (fail before any computation),
/// 2. recompute the cross-sample inclusion mask,
/// 3. cluster and profile every sample on the worker pool,
/// 4. barrier, then aggregate into consensus clusters and project the
///    per-sample signal matrix.
///
/// A sample whose positions all fail the inclusion filter yields empty
/// tables rather than aborting the run; any other per-sample failure is
/// reported as [`CageError::Execution`] naming the stage and sample.
pub fn run_pipeline<S: SignalStore>(
    store: &S,
    cfg: &PipelineConfig,
) -> Result<PipelineOutput, CageError> {
    cfg.validate()?;

    let samples: Vec<String> = store.samples().to_vec();
    let n = samples.len();
    info!("clustering {} samples", n);

    let filtered = store.filter_low_signal(
        cfg.clustering.threshold,
        cfg.clustering.threshold_is_tpm,
        cfg.clustering.nr_pass_threshold,
    );

    let per_sample = |idx: usize| -> Result<(Vec<TagCluster>, Vec<QuantileWidth>), CageError> {
        let sample = &samples[idx];
        let clusters = match cluster_sample(&filtered, idx, &cfg.clustering) {
            Ok(clusters) => clusters,
            Err(CageError::Data { sample, reason }) => {
                debug!("sample '{}' produced no clusters: {}", sample, reason);
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => return Err(e.in_stage(Stage::Clustering, sample)),
        };

        let mut widths = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let key = PartitionKey::new(&cluster.chr, cluster.strand);
            let members: Vec<Site> = filtered
                .sites_in(idx, &key, cluster.start, cluster.end)
                .into_iter()
                .filter(|s| s.included)
                .collect();
            match interquantile_width(
                sample,
                &cluster.chr,
                cluster.strand,
                cluster.start,
                cluster.end,
                &members,
                &cfg.quantiles,
            ) {
                Ok(width) => widths.push(width),
                Err(CageError::Data { .. }) => {}
                Err(e) => return Err(e.in_stage(Stage::Profiling, sample)),
            }
        }

        Ok((clusters, widths))
    };

    let results: Result<Vec<_>, CageError> = if cfg.parallel.enabled {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.parallel.worker_count.unwrap_or(0))
            .build()
            .map_err(|e| CageError::Configuration(format!("failed to build worker pool: {}", e)))?;

        let bar = ProgressBar::new(n as u64);
        let collected = pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|idx| {
                    let result = per_sample(idx);
                    bar.inc(1);
                    result
                })
                .collect()
        });
        bar.finish_and_clear();
        collected
    } else {
        (0..n).map(per_sample).collect()
    };

    // first error wins; completed results from other samples are dropped
    let results = results?;

    let mut tag_clusters = Vec::with_capacity(n);
    let mut tag_cluster_widths = Vec::new();
    for (clusters, widths) in results {
        tag_clusters.push(clusters);
        tag_cluster_widths.extend(widths);
    }

    // barrier passed: every per-sample result is in
    let consensus_clusters = aggregate_tag_clusters(&tag_clusters, &cfg.aggregation);
    let signal_matrix = consensus_signal_matrix(store, &consensus_clusters, &cfg.aggregation);
    let consensus_widths = consensus_quantile_widths(store, &consensus_clusters, &cfg.quantiles)?;

    info!(
        "{} consensus clusters from {} tag clusters",
        consensus_clusters.len(),
        tag_clusters.iter().map(Vec::len).sum::<usize>()
    );

    Ok(PipelineOutput {
        samples,
        tag_clusters,
        tag_cluster_widths,
        consensus_clusters,
        consensus_widths,
        signal_matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use cagers_core::models::{Ctss, FlatSignalStore, RleSignalStore, Strand};
    use pretty_assertions::assert_eq;
    use rand::seq::SliceRandom;
    use rstest::{fixture, rstest};

    use crate::config::{AggregationConfig, ClusteringConfig, ParallelConfig, QuantileConfig};

    fn ctss(chr: &str, strand: Strand, pos: u32, tpm: f64) -> Ctss {
        Ctss {
            chr: chr.to_string(),
            strand,
            pos,
            count: tpm as u32,
            tpm,
            included: true,
        }
    }

    fn records() -> Vec<(String, Vec<Ctss>)> {
        vec![
            (
                "a".to_string(),
                vec![
                    ctss("chr1", Strand::Plus, 100, 5.0),
                    ctss("chr1", Strand::Plus, 105, 3.0),
                    ctss("chr1", Strand::Plus, 110, 2.0),
                    ctss("chr1", Strand::Plus, 200, 10.0),
                    ctss("chr2", Strand::Minus, 50, 4.0),
                    ctss("chr2", Strand::Minus, 55, 6.0),
                ],
            ),
            (
                "b".to_string(),
                vec![
                    ctss("chr1", Strand::Plus, 105, 4.0),
                    ctss("chr1", Strand::Plus, 114, 2.0),
                    ctss("chr2", Strand::Minus, 52, 3.0),
                ],
            ),
        ]
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            clustering: ClusteringConfig {
                max_dist: 20,
                ..Default::default()
            },
            aggregation: AggregationConfig {
                max_dist: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[fixture]
    fn store() -> FlatSignalStore {
        FlatSignalStore::from_samples(records())
    }

    #[rstest]
    fn test_end_to_end(store: FlatSignalStore) {
        let out = run_pipeline(&store, &test_config()).unwrap();

        assert_eq!(out.samples, vec!["a".to_string(), "b".to_string()]);
        // sample a: chr1+ [100,111) and [200,201); chr2- [50,56)
        assert_eq!(out.tag_clusters[0].len(), 3);
        // sample b: chr1+ [105,115); chr2- [52,53)
        assert_eq!(out.tag_clusters[1].len(), 2);

        // a's [100,111) and b's [105,115) union to [100,115)
        let chr1_plus: Vec<&ConsensusCluster> = out
            .consensus_clusters
            .iter()
            .filter(|c| c.chr == "chr1" && c.strand == Strand::Plus)
            .collect();
        assert_eq!(chr1_plus.len(), 2);
        assert_eq!((chr1_plus[0].start, chr1_plus[0].end), (100, 115));
        assert_eq!((chr1_plus[1].start, chr1_plus[1].end), (200, 201));

        // dense matrix: sample b contributes nothing at [200,201)
        let col_200 = chr1_plus[1].id as usize;
        assert_eq!(out.signal_matrix.get(0, col_200), Some(10.0));
        assert_eq!(out.signal_matrix.get(1, col_200), Some(0.0));
    }

    #[rstest]
    fn test_worker_count_does_not_change_output(store: FlatSignalStore) {
        let mut single = test_config();
        single.parallel = ParallelConfig {
            enabled: true,
            worker_count: Some(1),
        };
        let mut many = test_config();
        many.parallel = ParallelConfig {
            enabled: true,
            worker_count: Some(4),
        };
        let mut sequential = test_config();
        sequential.parallel = ParallelConfig {
            enabled: false,
            worker_count: None,
        };

        let out_single = run_pipeline(&store, &single).unwrap();
        let out_many = run_pipeline(&store, &many).unwrap();
        let out_sequential = run_pipeline(&store, &sequential).unwrap();

        assert_eq!(out_single, out_many);
        assert_eq!(out_single, out_sequential);
    }

    #[rstest]
    fn test_backing_store_does_not_change_output(store: FlatSignalStore) {
        let rle = RleSignalStore::from_samples(records());
        let out_flat = run_pipeline(&store, &test_config()).unwrap();
        let out_rle = run_pipeline(&rle, &test_config()).unwrap();
        assert_eq!(out_flat, out_rle);
    }

    #[rstest]
    fn test_input_record_order_does_not_change_output(store: FlatSignalStore) {
        let mut shuffled = records();
        let mut rng = rand::rng();
        for (_, sample_records) in shuffled.iter_mut() {
            sample_records.shuffle(&mut rng);
        }
        let shuffled_store = FlatSignalStore::from_samples(shuffled);

        let out = run_pipeline(&store, &test_config()).unwrap();
        let out_shuffled = run_pipeline(&shuffled_store, &test_config()).unwrap();
        assert_eq!(out, out_shuffled);
    }

    #[rstest]
    fn test_sample_without_passing_positions_yields_empty_tables() {
        let mut with_weak = records();
        with_weak.push(("weak".to_string(), vec![ctss("chr3", Strand::Plus, 10, 0.1)]));
        let store = FlatSignalStore::from_samples(with_weak);

        // default threshold of 1 tpm excludes the weak sample's only position
        let out = run_pipeline(&store, &test_config()).unwrap();
        assert_eq!(out.tag_clusters[2], vec![]);
        // dense matrix still carries a row for it
        assert_eq!(out.signal_matrix.rows(), 3);
    }

    #[rstest]
    fn test_invalid_config_fails_before_running(store: FlatSignalStore) {
        let mut cfg = test_config();
        cfg.quantiles = QuantileConfig {
            q_low: 0.6,
            q_up: 0.9,
        };
        let err = run_pipeline(&store, &cfg).unwrap_err();
        assert!(matches!(err, CageError::Configuration(_)));
    }

    #[rstest]
    fn test_tag_cluster_widths_cover_all_clusters(store: FlatSignalStore) {
        let out = run_pipeline(&store, &test_config()).unwrap();
        let n_clusters: usize = out.tag_clusters.iter().map(Vec::len).sum();
        assert_eq!(out.tag_cluster_widths.len(), n_clusters);
        assert!(out.tag_cluster_widths.iter().all(|w| {
            w.q_low_pos >= w.cluster_start && w.q_up_pos < w.cluster_end
        }));
    }
}
