//! Clustering of per-base CAGE signal into tag clusters and consensus
//! clusters.
//!
//! The pipeline runs in three phases over a [`cagers_core::models::SignalStore`]:
//!
//! 1. **Per-sample clustering** — each sample's included CTSS positions
//!    are grouped into [`TagCluster`](cagers_core::models::TagCluster)s,
//!    either by a distance rule ([`distclu`]) or by recursive density
//!    splitting ([`paraclu`]). Samples are independent and run on a
//!    bounded rayon pool.
//! 2. **Profiling** — for every cluster, the strand-oriented cumulative
//!    signal curve yields quantile positions and an interquantile width
//!    ([`profile`]).
//! 3. **Aggregation** — after all samples finish, tag-cluster intervals
//!    are merged genome-wide into consensus clusters and every sample's
//!    signal is re-projected over them into a dense matrix ([`aggregate`]).
//!
//! Outputs are deterministic: partition maps iterate in (chromosome,
//! strand) order and per-sample results are collected in sample order,
//! so a run with one worker and a run with N workers produce identical
//! tables.
//!
//! # Quick start
//!
//! ```
//! use cagers_core::models::{Ctss, FlatSignalStore, Strand};
//! use cagers_clustering::{PipelineConfig, run_pipeline};
//!
//! let ctss = |pos: u32, tpm: f64| Ctss {
//!     chr: "chr1".to_string(),
//!     strand: Strand::Plus,
//!     pos,
//!     count: tpm as u32,
//!     tpm,
//!     included: true,
//! };
//!
//! let store = FlatSignalStore::from_samples(vec![
//!     ("a".to_string(), vec![ctss(100, 5.0), ctss(105, 3.0), ctss(200, 10.0)]),
//!     ("b".to_string(), vec![ctss(103, 4.0)]),
//! ]);
//!
//! let out = run_pipeline(&store, &PipelineConfig::default()).unwrap();
//! assert_eq!(out.samples, vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(out.signal_matrix.rows(), 2);
//! ```

pub mod aggregate;
pub mod cluster;
pub mod config;
pub mod distclu;
pub mod paraclu;
pub mod pipeline;
pub mod profile;

// re-exports
pub use aggregate::{aggregate_tag_clusters, consensus_quantile_widths, consensus_signal_matrix};
pub use cluster::cluster_sample;
pub use config::{
    AggregationConfig, ClusterMethod, ClusteringConfig, ParallelConfig, PipelineConfig,
    QuantileConfig,
};
pub use pipeline::{PipelineOutput, run_pipeline};
pub use profile::{CumulativeProfile, QuantileWidth};
