use std::collections::BTreeMap;

use crate::models::ctss::{Ctss, Strand};

/// Key of one (chromosome, strand) partition of the genome.
///
/// Derives `Ord` (chromosome first, then `+` before `-`) so that
/// `BTreeMap`-keyed partitions always iterate in the same order,
/// independent of input order or worker scheduling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub chr: String,
    pub strand: Strand,
}

impl PartitionKey {
    pub fn new(chr: &str, strand: Strand) -> Self {
        PartitionKey {
            chr: chr.to_string(),
            strand,
        }
    }
}

/// Signal of one sample at one base of a partition. The chromosome and
/// strand are implied by the partition the site came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub pos: u32,
    pub count: u32,
    pub tpm: f64,
    pub included: bool,
}

/// The signal table contract: per-sample, position-sorted CTSS signal,
/// partitioned by (chromosome, strand).
///
/// Two backings implement it — [`FlatSignalStore`] (row-major records)
/// and [`RleSignalStore`] (column-wise runs of consecutive positions).
/// Callers of the clustering pipeline never learn which one they hold.
///
/// The store is read-only during a run. The one mutating-looking
/// operation, [`filter_low_signal`](SignalStore::filter_low_signal),
/// returns a new store and leaves the receiver untouched.
pub trait SignalStore: Send + Sync {
    /// Sample names in stable input order. This order is the row order
    /// of every derived matrix and table.
    fn samples(&self) -> &[String];

    /// All (chromosome, strand) partitions holding signal in any sample,
    /// in deterministic (chromosome, strand) order.
    fn partitions(&self) -> Vec<PartitionKey>;

    /// One sample's sites in a partition, sorted by ascending position.
    /// Empty when the sample has no signal there.
    fn sites(&self, sample_idx: usize, partition: &PartitionKey) -> Vec<Site>;

    /// One sample's sites within `[start, end)` of a partition.
    fn sites_in(
        &self,
        sample_idx: usize,
        partition: &PartitionKey,
        start: u32,
        end: u32,
    ) -> Vec<Site> {
        let sites = self.sites(sample_idx, partition);
        let lo = sites.partition_point(|s| s.pos < start);
        let hi = sites.partition_point(|s| s.pos < end);
        sites[lo..hi].to_vec()
    }

    /// Recompute the inclusion mask across samples: a position is kept
    /// when its signal clears `threshold` (raw count or tpm, per
    /// `threshold_is_tpm`) in at least `nr_pass` samples.
    ///
    /// Returns a new store with the mask applied; the receiver keeps its
    /// original mask, so per-sample tasks can hold shared references
    /// while a caller re-filters with different parameters.
    fn filter_low_signal(&self, threshold: f64, threshold_is_tpm: bool, nr_pass: usize) -> Self
    where
        Self: Sized;
}

/// Count, per position of one partition, how many samples clear the
/// signal threshold there.
fn threshold_passes(
    per_sample: &[Vec<Site>],
    threshold: f64,
    threshold_is_tpm: bool,
) -> BTreeMap<u32, usize> {
    let mut passes: BTreeMap<u32, usize> = BTreeMap::new();
    for sites in per_sample {
        for site in sites {
            let signal = if threshold_is_tpm {
                site.tpm
            } else {
                site.count as f64
            };
            if signal >= threshold {
                *passes.entry(site.pos).or_insert(0) += 1;
            }
        }
    }
    passes
}

fn apply_mask(per_sample: &[Vec<Site>], passes: &BTreeMap<u32, usize>, nr_pass: usize) -> Vec<Vec<Site>> {
    per_sample
        .iter()
        .map(|sites| {
            sites
                .iter()
                .map(|site| Site {
                    included: passes.get(&site.pos).is_some_and(|n| *n >= nr_pass),
                    ..*site
                })
                .collect()
        })
        .collect()
}

/// Flat tabular signal store: for every partition, one position-sorted
/// `Vec<Site>` per sample.
#[derive(Debug, Clone, Default)]
pub struct FlatSignalStore {
    samples: Vec<String>,
    partitions: BTreeMap<PartitionKey, Vec<Vec<Site>>>,
}

impl FlatSignalStore {
    /// Build a store from per-sample CTSS records. Records may arrive in
    /// any order; each partition is sorted by position on construction.
    pub fn from_samples(samples: Vec<(String, Vec<Ctss>)>) -> Self {
        let n_samples = samples.len();
        let mut names = Vec::with_capacity(n_samples);
        let mut partitions: BTreeMap<PartitionKey, Vec<Vec<Site>>> = BTreeMap::new();

        for (sample_idx, (name, records)) in samples.into_iter().enumerate() {
            names.push(name);
            for ctss in records {
                let key = PartitionKey {
                    chr: ctss.chr,
                    strand: ctss.strand,
                };
                let per_sample = partitions
                    .entry(key)
                    .or_insert_with(|| vec![Vec::new(); n_samples]);
                per_sample[sample_idx].push(Site {
                    pos: ctss.pos,
                    count: ctss.count,
                    tpm: ctss.tpm,
                    included: ctss.included,
                });
            }
        }

        for per_sample in partitions.values_mut() {
            for sites in per_sample.iter_mut() {
                sites.sort_by_key(|s| s.pos);
            }
        }

        FlatSignalStore {
            samples: names,
            partitions,
        }
    }

    /// Total number of stored sites across all samples and partitions.
    pub fn n_sites(&self) -> usize {
        self.partitions
            .values()
            .map(|per_sample| per_sample.iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_sites() == 0
    }
}

impl SignalStore for FlatSignalStore {
    fn samples(&self) -> &[String] {
        &self.samples
    }

    fn partitions(&self) -> Vec<PartitionKey> {
        self.partitions.keys().cloned().collect()
    }

    fn sites(&self, sample_idx: usize, partition: &PartitionKey) -> Vec<Site> {
        self.partitions
            .get(partition)
            .and_then(|per_sample| per_sample.get(sample_idx))
            .cloned()
            .unwrap_or_default()
    }

    fn filter_low_signal(&self, threshold: f64, threshold_is_tpm: bool, nr_pass: usize) -> Self {
        let partitions = self
            .partitions
            .iter()
            .map(|(key, per_sample)| {
                let passes = threshold_passes(per_sample, threshold, threshold_is_tpm);
                (key.clone(), apply_mask(per_sample, &passes, nr_pass))
            })
            .collect();

        FlatSignalStore {
            samples: self.samples.clone(),
            partitions,
        }
    }
}

/// A maximal run of consecutive genomic positions with signal, stored
/// column-wise. Position `start + i` carries `counts[i]` / `tpms[i]`.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    start: u32,
    counts: Vec<u32>,
    tpms: Vec<f64>,
    included: Vec<bool>,
}

impl Run {
    fn decode(&self, out: &mut Vec<Site>) {
        for i in 0..self.counts.len() {
            out.push(Site {
                pos: self.start + i as u32,
                count: self.counts[i],
                tpm: self.tpms[i],
                included: self.included[i],
            });
        }
    }
}

fn encode_runs(sites: &[Site]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for site in sites {
        match runs.last_mut() {
            Some(run) if site.pos == run.start + run.counts.len() as u32 => {
                run.counts.push(site.count);
                run.tpms.push(site.tpm);
                run.included.push(site.included);
            }
            _ => runs.push(Run {
                start: site.pos,
                counts: vec![site.count],
                tpms: vec![site.tpm],
                included: vec![site.included],
            }),
        }
    }
    runs
}

/// Run-length signal store: the same table as [`FlatSignalStore`], but
/// each partition holds column-wise runs of consecutive positions.
/// Dense promoter regions compress well; sparse positions degrade to
/// one-base runs.
#[derive(Debug, Clone, Default)]
pub struct RleSignalStore {
    samples: Vec<String>,
    partitions: BTreeMap<PartitionKey, Vec<Vec<Run>>>,
}

impl RleSignalStore {
    pub fn from_samples(samples: Vec<(String, Vec<Ctss>)>) -> Self {
        FlatSignalStore::from_samples(samples).into()
    }
}

impl From<FlatSignalStore> for RleSignalStore {
    fn from(flat: FlatSignalStore) -> Self {
        let partitions = flat
            .partitions
            .iter()
            .map(|(key, per_sample)| {
                let runs = per_sample.iter().map(|sites| encode_runs(sites)).collect();
                (key.clone(), runs)
            })
            .collect();

        RleSignalStore {
            samples: flat.samples,
            partitions,
        }
    }
}

impl SignalStore for RleSignalStore {
    fn samples(&self) -> &[String] {
        &self.samples
    }

    fn partitions(&self) -> Vec<PartitionKey> {
        self.partitions.keys().cloned().collect()
    }

    fn sites(&self, sample_idx: usize, partition: &PartitionKey) -> Vec<Site> {
        let mut out = Vec::new();
        if let Some(per_sample) = self.partitions.get(partition) {
            if let Some(runs) = per_sample.get(sample_idx) {
                for run in runs {
                    run.decode(&mut out);
                }
            }
        }
        out
    }

    fn filter_low_signal(&self, threshold: f64, threshold_is_tpm: bool, nr_pass: usize) -> Self {
        let partitions = self
            .partitions
            .iter()
            .map(|(key, per_sample)| {
                let decoded: Vec<Vec<Site>> = (0..per_sample.len())
                    .map(|idx| self.sites(idx, key))
                    .collect();
                let passes = threshold_passes(&decoded, threshold, threshold_is_tpm);
                let masked = apply_mask(&decoded, &passes, nr_pass);
                let runs = masked.iter().map(|sites| encode_runs(sites)).collect();
                (key.clone(), runs)
            })
            .collect();

        RleSignalStore {
            samples: self.samples.clone(),
            partitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn ctss(chr: &str, strand: Strand, pos: u32, count: u32, tpm: f64) -> Ctss {
        Ctss {
            chr: chr.to_string(),
            strand,
            pos,
            count,
            tpm,
            included: true,
        }
    }

    #[fixture]
    fn two_samples() -> Vec<(String, Vec<Ctss>)> {
        vec![
            (
                "sample_a".to_string(),
                vec![
                    ctss("chr1", Strand::Plus, 102, 1, 0.5),
                    ctss("chr1", Strand::Plus, 100, 5, 2.5),
                    ctss("chr1", Strand::Plus, 101, 3, 1.5),
                    ctss("chr2", Strand::Minus, 50, 4, 2.0),
                ],
            ),
            (
                "sample_b".to_string(),
                vec![
                    ctss("chr1", Strand::Plus, 100, 2, 1.0),
                    ctss("chr1", Strand::Plus, 200, 8, 4.0),
                ],
            ),
        ]
    }

    #[rstest]
    fn test_site_counts(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        assert_eq!(store.n_sites(), 6);
        assert!(!store.is_empty());
        assert!(FlatSignalStore::from_samples(vec![]).is_empty());
    }

    #[rstest]
    fn test_partitions_are_ordered(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        let parts = store.partitions();
        assert_eq!(
            parts,
            vec![
                PartitionKey::new("chr1", Strand::Plus),
                PartitionKey::new("chr2", Strand::Minus),
            ]
        );
    }

    #[rstest]
    fn test_sites_sorted_per_sample(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        let key = PartitionKey::new("chr1", Strand::Plus);

        let a = store.sites(0, &key);
        assert_eq!(a.iter().map(|s| s.pos).collect::<Vec<_>>(), vec![100, 101, 102]);

        // sample_b has no signal on chr2-
        let b = store.sites(1, &PartitionKey::new("chr2", Strand::Minus));
        assert_eq!(b, vec![]);
    }

    #[rstest]
    fn test_sites_in_half_open(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        let key = PartitionKey::new("chr1", Strand::Plus);

        let window = store.sites_in(0, &key, 101, 102);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].pos, 101);
    }

    #[rstest]
    fn test_flat_and_rle_agree(two_samples: Vec<(String, Vec<Ctss>)>) {
        let flat = FlatSignalStore::from_samples(two_samples.clone());
        let rle = RleSignalStore::from_samples(two_samples);

        assert_eq!(flat.samples(), rle.samples());
        assert_eq!(flat.partitions(), rle.partitions());
        for key in flat.partitions() {
            for idx in 0..flat.samples().len() {
                assert_eq!(flat.sites(idx, &key), rle.sites(idx, &key));
            }
        }
    }

    #[rstest]
    fn test_rle_compresses_consecutive_positions(two_samples: Vec<(String, Vec<Ctss>)>) {
        let rle = RleSignalStore::from_samples(two_samples);
        let key = PartitionKey::new("chr1", Strand::Plus);
        // 100,101,102 is one run for sample_a; 100 and 200 are two for sample_b
        assert_eq!(rle.partitions[&key][0].len(), 1);
        assert_eq!(rle.partitions[&key][1].len(), 2);
    }

    #[rstest]
    fn test_filter_low_signal_mask(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        // tpm >= 1.0 in at least 2 samples: only pos 100 on chr1+ qualifies
        let filtered = store.filter_low_signal(1.0, true, 2);
        let key = PartitionKey::new("chr1", Strand::Plus);

        let a = filtered.sites(0, &key);
        assert_eq!(
            a.iter().map(|s| (s.pos, s.included)).collect::<Vec<_>>(),
            vec![(100, true), (101, false), (102, false)]
        );

        // original store keeps its mask
        assert!(store.sites(0, &key).iter().all(|s| s.included));
    }

    #[rstest]
    fn test_filter_low_signal_raw_counts(two_samples: Vec<(String, Vec<Ctss>)>) {
        let store = FlatSignalStore::from_samples(two_samples);
        // raw count >= 3 in at least 1 sample
        let filtered = store.filter_low_signal(3.0, false, 1);
        let key = PartitionKey::new("chr1", Strand::Plus);

        let b = filtered.sites(1, &key);
        assert_eq!(
            b.iter().map(|s| (s.pos, s.included)).collect::<Vec<_>>(),
            vec![(100, true), (200, true)]
        );
        // pos 102 clears in no sample
        let a = filtered.sites(0, &key);
        assert!(!a[2].included);
    }

    #[rstest]
    fn test_filter_agrees_across_backings(two_samples: Vec<(String, Vec<Ctss>)>) {
        let flat = FlatSignalStore::from_samples(two_samples.clone()).filter_low_signal(1.0, true, 2);
        let rle = RleSignalStore::from_samples(two_samples).filter_low_signal(1.0, true, 2);

        for key in flat.partitions() {
            for idx in 0..flat.samples().len() {
                assert_eq!(flat.sites(idx, &key), rle.sites(idx, &key));
            }
        }
    }
}
