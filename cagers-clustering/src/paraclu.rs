//! Parametric density clustering: recursively split each (chromosome,
//! strand) partition at its weakest internal boundary, producing a
//! hierarchy of candidate clusters annotated with the density range over
//! which they hold together. A candidate's `max_density / min_density`
//! ratio is its stability score.
//!
//! Selection keeps candidates no longer than `max_cluster_length` whose
//! stability clears `min_stability`, then resolves the hierarchy to a
//! single level by keeping the outermost passing candidates, so the
//! output satisfies the same contract as distclu: disjoint clusters per
//! partition, same record shape.

use std::cmp::Ordering;

use cagers_core::models::{PartitionKey, Site, TagCluster};

use crate::cluster::build_cluster;
use crate::config::ClusteringConfig;

/// A segment of the site list together with the density interval over
/// which it is a maximal cluster. Indices are `[begin, end)` into the
/// partition's site slice.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    begin: usize,
    end: usize,
    min_density: f64,
    max_density: f64,
}

impl Candidate {
    fn stability(&self) -> f64 {
        if self.min_density <= 0.0 {
            f64::INFINITY
        } else {
            self.max_density / self.min_density
        }
    }

    fn overlaps(&self, other: &Candidate) -> bool {
        self.begin < other.end && self.end > other.begin
    }
}

/// Weakest prefix: the internal boundary `k` minimizing the density of
/// `sites[..k]` measured against the distance to site `k`. Requires at
/// least two sites.
fn weakest_prefix(sites: &[Site]) -> (usize, f64) {
    let origin = sites[0].pos;
    let mut total = sites[0].tpm;
    let mut best_break = 1;
    let mut best_density = f64::INFINITY;

    for k in 1..sites.len() {
        let density = total / (sites[k].pos - origin) as f64;
        if density < best_density {
            best_density = density;
            best_break = k;
        }
        total += sites[k].tpm;
    }
    (best_break, best_density)
}

/// Weakest suffix, symmetric to [`weakest_prefix`]: the boundary `k`
/// minimizing the density of `sites[k..]` measured against the distance
/// from site `k - 1`.
fn weakest_suffix(sites: &[Site]) -> (usize, f64) {
    let last = sites.len() - 1;
    let origin = sites[last].pos;
    let mut total = sites[last].tpm;
    let mut best_break = last;
    let mut best_density = f64::INFINITY;

    for k in (0..last).rev() {
        let density = total / (origin - sites[k].pos) as f64;
        if density < best_density {
            best_density = density;
            best_break = k + 1;
        }
        total += sites[k].tpm;
    }
    (best_break, best_density)
}

/// Recursive minimum-density splitting. A segment is a candidate over
/// `(min_density, max_density]`, where `max_density` is the density at
/// its weakest boundary; splitting there raises the floor for both
/// halves.
fn split(sites: &[Site], offset: usize, min_density: f64, out: &mut Vec<Candidate>) {
    if sites.is_empty() {
        return;
    }
    if sites.len() == 1 {
        out.push(Candidate {
            begin: offset,
            end: offset + 1,
            min_density,
            max_density: f64::INFINITY,
        });
        return;
    }

    let (prefix_break, prefix_density) = weakest_prefix(sites);
    let (suffix_break, suffix_density) = weakest_suffix(sites);
    let (break_idx, max_density) = if prefix_density <= suffix_density {
        (prefix_break, prefix_density)
    } else {
        (suffix_break, suffix_density)
    };

    if max_density > min_density {
        out.push(Candidate {
            begin: offset,
            end: offset + sites.len(),
            min_density,
            max_density,
        });
    }

    let floor = min_density.max(max_density);
    split(&sites[..break_idx], offset, floor, out);
    split(&sites[break_idx..], offset + break_idx, floor, out);
}

/// Cluster one partition's included sites by recursive density
/// splitting. `sites` must be non-empty and sorted by ascending position.
pub(crate) fn cluster_partition(
    sample: &str,
    partition: &PartitionKey,
    sites: &[Site],
    cfg: &ClusteringConfig,
) -> Vec<TagCluster> {
    let mut candidates = Vec::new();
    split(sites, 0, 0.0, &mut candidates);

    let mut kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            let length = sites[c.end - 1].pos - sites[c.begin].pos + 1;
            length <= cfg.max_cluster_length && c.stability() >= cfg.min_stability
        })
        .collect();

    // candidates form a laminar hierarchy; keep the outermost passing
    // level by scanning (begin asc, widest first) and dropping anything
    // nested under an already-kept candidate
    kept.sort_by(|a, b| {
        a.begin
            .cmp(&b.begin)
            .then((b.end - b.begin).cmp(&(a.end - a.begin)))
            .then(
                b.stability()
                    .partial_cmp(&a.stability())
                    .unwrap_or(Ordering::Equal),
            )
    });

    let mut chosen: Vec<Candidate> = Vec::new();
    for candidate in kept {
        if chosen.iter().all(|c| !c.overlaps(&candidate)) {
            chosen.push(candidate);
        }
    }

    chosen
        .iter()
        .map(|c| build_cluster(sample, partition, &sites[c.begin..c.end]))
        .collect()
}
