use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

use crate::catalog::store::GenomeCatalog;
use crate::core::error::HitError;
use crate::core::occurrence::Occurrence;
use crate::core::types::{GenomeId, Strand};

/// Outcome counters of one merge call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Occurrences appended to the hit
    pub added: usize,
    /// Occurrences already present
    pub duplicates: usize,
    /// Occurrences on genomes unknown to the catalog
    pub skipped: usize,
}

impl MergeStats {
    /// Occurrences offered to the merge, whatever became of them
    #[must_use]
    pub fn received(&self) -> usize {
        self.added + self.duplicates + self.skipped
    }

    fn absorb(&mut self, other: Self) {
        self.added += other.added;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
    }
}

/// Deduplicated occurrences of one genome, in arrival order
#[derive(Debug, Clone, Default)]
struct GenomeBucket {
    occurrences: Vec<Occurrence>,
    seen: HashSet<(u64, Strand)>,
}

impl GenomeBucket {
    /// Append unless the site is already present. Returns true if appended.
    fn push(&mut self, occurrence: Occurrence) -> bool {
        if self.seen.insert(occurrence.site()) {
            self.occurrences.push(occurrence);
            true
        } else {
            false
        }
    }
}

/// All occurrences of one motif, grouped by genome.
///
/// Within a genome, occurrences keep first-seen order and each
/// `(coordinate, strand)` appears once. Genomes iterate in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct Hit {
    motif: String,
    genomes: BTreeMap<GenomeId, GenomeBucket>,
    total: usize,
}

impl Hit {
    pub fn new(motif: impl Into<String>) -> Self {
        Self {
            motif: motif.into(),
            genomes: BTreeMap::new(),
            total: 0,
        }
    }

    #[must_use]
    pub fn motif(&self) -> &str {
        &self.motif
    }

    /// Merge a batch of occurrences.
    ///
    /// Occurrences on genomes missing from the catalog are logged and skipped;
    /// the rest of the batch is still merged.
    pub fn merge<I>(&mut self, incoming: I, catalog: &GenomeCatalog) -> MergeStats
    where
        I: IntoIterator<Item = Occurrence>,
    {
        let mut stats = MergeStats::default();

        for occurrence in incoming {
            if !catalog.contains(&occurrence.genome_id) {
                let err = HitError::UnknownGenome(occurrence.genome_id.clone());
                warn!(occurrence = %occurrence, error = %err, "Skipping occurrence");
                stats.skipped += 1;
                continue;
            }

            let bucket = self.genomes.entry(occurrence.genome_id.clone()).or_default();
            if bucket.push(occurrence) {
                self.total += 1;
                stats.added += 1;
            } else {
                stats.duplicates += 1;
            }
        }

        stats
    }

    /// Merge another hit for the same motif into this one
    pub fn merge_hit(&mut self, other: Hit, catalog: &GenomeCatalog) -> MergeStats {
        let mut stats = MergeStats::default();
        for (_, bucket) in other.genomes {
            stats.absorb(self.merge(bucket.occurrences, catalog));
        }
        stats
    }

    /// Total number of distinct occurrences
    #[must_use]
    pub fn number_occurrences(&self) -> usize {
        self.total
    }

    /// All occurrences, ascending genome id then insertion order
    pub fn list_occ(&self) -> impl Iterator<Item = &Occurrence> {
        self.genomes.values().flat_map(|b| b.occurrences.iter())
    }

    /// Occurrences on one genome, in insertion order
    #[must_use]
    pub fn occurrences_in(&self, genome_id: &GenomeId) -> &[Occurrence] {
        self.genomes
            .get(genome_id)
            .map_or(&[][..], |b| b.occurrences.as_slice())
    }

    /// Genomes with at least one occurrence, ascending
    pub fn genome_ids(&self) -> impl Iterator<Item = &GenomeId> {
        self.genomes.keys()
    }

    #[must_use]
    pub fn genome_count(&self) -> usize {
        self.genomes.len()
    }

    #[must_use]
    pub fn contains(&self, occurrence: &Occurrence) -> bool {
        self.genomes
            .get(&occurrence.genome_id)
            .is_some_and(|b| b.seen.contains(&occurrence.site()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Concurrent accumulator for one query's shard results.
///
/// Each genome bucket sits behind its own `DashMap` entry lock, held across the
/// dedup check and the insert. The total is an atomic counter.
#[derive(Debug, Default)]
pub struct SharedHit {
    motif: String,
    genomes: DashMap<GenomeId, GenomeBucket>,
    total: AtomicUsize,
}

impl SharedHit {
    pub fn new(motif: impl Into<String>) -> Self {
        Self {
            motif: motif.into(),
            genomes: DashMap::new(),
            total: AtomicUsize::new(0),
        }
    }

    /// Merge a batch of occurrences (thread-safe)
    pub fn merge<I>(&self, incoming: I, catalog: &GenomeCatalog) -> MergeStats
    where
        I: IntoIterator<Item = Occurrence>,
    {
        let mut stats = MergeStats::default();

        for occurrence in incoming {
            if !catalog.contains(&occurrence.genome_id) {
                let err = HitError::UnknownGenome(occurrence.genome_id.clone());
                warn!(occurrence = %occurrence, error = %err, "Skipping occurrence");
                stats.skipped += 1;
                continue;
            }

            let added = self
                .genomes
                .entry(occurrence.genome_id.clone())
                .or_default()
                .push(occurrence);
            if added {
                self.total.fetch_add(1, Ordering::Relaxed);
                stats.added += 1;
            } else {
                stats.duplicates += 1;
            }
        }

        stats
    }

    #[must_use]
    pub fn number_occurrences(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Copy the current state into a plain [`Hit`]
    #[must_use]
    pub fn snapshot(&self) -> Hit {
        let genomes: BTreeMap<GenomeId, GenomeBucket> = self
            .genomes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let total = genomes.values().map(|b| b.occurrences.len()).sum();

        Hit {
            motif: self.motif.clone(),
            genomes,
            total,
        }
    }

    /// Consume the accumulator once every writer is done
    #[must_use]
    pub fn into_hit(self) -> Hit {
        let genomes: BTreeMap<GenomeId, GenomeBucket> = self.genomes.into_iter().collect();
        let total = genomes.values().map(|b| b.occurrences.len()).sum();

        Hit {
            motif: self.motif,
            genomes,
            total,
        }
    }
}
