use serde::{Deserialize, Serialize};

use cagers_core::CageError;

/// Which within-sample clustering strategy to run. Both produce the same
/// record shape and the same non-overlap guarantees, so downstream
/// profiling and aggregation never branch on the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMethod {
    /// Distance rule: a gap wider than `max_dist` starts a new cluster.
    #[default]
    Distclu,
    /// Recursive minimum-density splitting with stability selection.
    Paraclu,
}

/// Options for the within-sample clusterer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub method: ClusterMethod,
    /// Maximum gap between neighboring CTSS positions inside one cluster
    /// (distclu only).
    pub max_dist: u32,
    /// Signal a position must clear to stay included.
    pub threshold: f64,
    /// Evaluate `threshold` on normalized signal (true) or raw counts.
    pub threshold_is_tpm: bool,
    /// Number of samples in which `threshold` must be cleared.
    pub nr_pass_threshold: usize,
    /// Drop clusters with exactly one member position.
    pub remove_singletons: bool,
    /// Keep a singleton anyway when its signal exceeds this value.
    pub keep_singletons_above: f64,
    /// Minimum max/min density ratio for a paraclu candidate.
    pub min_stability: f64,
    /// Longest paraclu candidate kept, in base pairs.
    pub max_cluster_length: u32,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            method: ClusterMethod::Distclu,
            max_dist: 20,
            threshold: 1.0,
            threshold_is_tpm: true,
            nr_pass_threshold: 1,
            remove_singletons: false,
            keep_singletons_above: f64::INFINITY,
            min_stability: 1.0,
            max_cluster_length: 500,
        }
    }
}

/// Cumulative-signal quantiles bounding the interquantile width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuantileConfig {
    /// Lower quantile, in `[0, 0.5)`.
    pub q_low: f64,
    /// Upper quantile, in `(0.5, 1]`.
    pub q_up: f64,
}

impl Default for QuantileConfig {
    fn default() -> Self {
        QuantileConfig {
            q_low: 0.1,
            q_up: 0.9,
        }
    }
}

impl QuantileConfig {
    pub fn validate(&self) -> Result<(), CageError> {
        if !(0.0..0.5).contains(&self.q_low) {
            return Err(CageError::Configuration(format!(
                "q_low must be in [0, 0.5), got {}",
                self.q_low
            )));
        }
        if !(self.q_up > 0.5 && self.q_up <= 1.0) {
            return Err(CageError::Configuration(format!(
                "q_up must be in (0.5, 1], got {}",
                self.q_up
            )));
        }
        if self.q_low >= self.q_up {
            return Err(CageError::Configuration(format!(
                "q_low ({}) must be below q_up ({})",
                self.q_low, self.q_up
            )));
        }
        Ok(())
    }
}

/// Options for cross-sample aggregation into consensus clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Tag clusters separated by at most this many bases merge into one
    /// consensus cluster. The boundary is inclusive: a gap of exactly
    /// `max_dist` merges.
    pub max_dist: u32,
    /// Zero out matrix entries below `tpm_threshold`.
    pub exclude_signal_below_threshold: bool,
    pub tpm_threshold: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            max_dist: 100,
            exclude_signal_below_threshold: false,
            tpm_threshold: 5.0,
        }
    }
}

/// Worker-pool sizing for the per-sample phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    pub enabled: bool,
    /// Pool size; `None` uses all available execution units.
    pub worker_count: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            enabled: true,
            worker_count: None,
        }
    }
}

/// Full configuration surface of a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub clustering: ClusteringConfig,
    pub quantiles: QuantileConfig,
    pub aggregation: AggregationConfig,
    pub parallel: ParallelConfig,
}

impl PipelineConfig {
    /// Check every option before any computation starts. Configuration
    /// errors are never retried.
    pub fn validate(&self) -> Result<(), CageError> {
        let c = &self.clustering;
        if c.threshold < 0.0 || !c.threshold.is_finite() {
            return Err(CageError::Configuration(format!(
                "threshold must be a non-negative finite value, got {}",
                c.threshold
            )));
        }
        if c.nr_pass_threshold < 1 {
            return Err(CageError::Configuration(
                "nr_pass_threshold must be at least 1".to_string(),
            ));
        }
        if c.min_stability < 0.0 || c.min_stability.is_nan() {
            return Err(CageError::Configuration(format!(
                "min_stability must be non-negative, got {}",
                c.min_stability
            )));
        }
        if c.max_cluster_length == 0 {
            return Err(CageError::Configuration(
                "max_cluster_length must be at least 1".to_string(),
            ));
        }

        self.quantiles.validate()?;

        let a = &self.aggregation;
        if a.tpm_threshold < 0.0 || !a.tpm_threshold.is_finite() {
            return Err(CageError::Configuration(format!(
                "tpm_threshold must be a non-negative finite value, got {}",
                a.tpm_threshold
            )));
        }

        if let Some(workers) = self.parallel.worker_count {
            if self.parallel.enabled && workers == 0 {
                return Err(CageError::Configuration(
                    "worker_count must be at least 1 when parallelism is enabled".to_string(),
                ));
            }
        }

        Ok(())
    }
}
