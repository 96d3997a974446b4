//! Core data model for CAGE transcription start site (CTSS) analysis.
//!
//! This crate holds the entities shared by the clustering pipeline:
//!
//! - [`models::Ctss`] — a single genomic base with observed 5′ signal
//! - [`models::SignalStore`] — the per-sample signal table contract, with a
//!   flat tabular backing ([`models::FlatSignalStore`]) and a run-length
//!   backing ([`models::RleSignalStore`])
//! - [`models::TagCluster`] — a within-sample cluster of CTSS positions
//! - [`models::ConsensusCluster`] — a cross-sample merged interval
//! - [`models::SignalMatrix`] — a dense sample × consensus-cluster matrix
//!
//! All algorithms over these entities live in the `cagers-clustering`
//! crate; this crate should stay free of clustering logic so that callers
//! can depend on the model without pulling in the pipeline.

pub mod errors;
pub mod models;

// re-exports
pub use errors::{CageError, Stage};
