use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::catalog::genes::GeneCatalog;
use crate::catalog::store::GenomeCatalog;
use crate::core::error::HitError;
use crate::core::occurrence::Occurrence;
use crate::core::types::{GeneId, GenomeId, TaxonCriteria};
use crate::parsing::blast::AlignmentRecord;
use crate::resolve::merger::Hit;

/// Gene-centric result unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSummary {
    pub gene_id: GeneId,
    pub organisms: BTreeSet<String>,
    pub occurrence_count: usize,
    pub genomes: BTreeSet<GenomeId>,

    /// Best qualifying alignment, for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_identity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_length: Option<u64>,

    pub occurrences: Vec<Occurrence>,
}

/// Genome-centric result unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeSummary {
    pub genome_id: GenomeId,
    pub organism: String,
    pub taxon: String,
    pub occurrence_count: usize,
    pub occurrences: Vec<Occurrence>,
}

/// Combines merged occurrences with the filter's gene decisions
pub struct ResultAggregator<'a> {
    catalog: &'a GenomeCatalog,
    genes: &'a GeneCatalog,
    criteria: &'a TaxonCriteria,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(
        catalog: &'a GenomeCatalog,
        genes: &'a GeneCatalog,
        criteria: &'a TaxonCriteria,
    ) -> Self {
        Self {
            catalog,
            genes,
            criteria,
        }
    }

    /// Build one summary per qualifying gene that passes the taxon criteria.
    ///
    /// A gene with a span only counts occurrences whose whole motif lies inside
    /// it; otherwise every occurrence on its genome counts. Occurrences are listed in ascending
    /// coordinate order whatever order the shards arrived in. Genes missing from the gene catalog,
    /// or whose genome is unknown, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `HitError::EmptySearch` if the surviving summaries hold no
    /// occurrences at all.
    pub fn aggregate(
        &self,
        hit: &Hit,
        qualifying_genes: &BTreeSet<GeneId>,
        best: &BTreeMap<GeneId, &AlignmentRecord>,
    ) -> Result<Vec<GeneSummary>, HitError> {
        let mut summaries = Vec::with_capacity(qualifying_genes.len());
        let motif_len = hit.motif().len() as u64;

        for gene_id in qualifying_genes {
            let Some(gene) = self.genes.get(gene_id) else {
                warn!(gene = %gene_id, "Qualifying gene not in gene catalog, skipping");
                continue;
            };
            let Some(genome) = self.catalog.get(&gene.genome_id) else {
                warn!(
                    gene = %gene_id,
                    genome = %gene.genome_id,
                    "Gene on unknown genome, skipping"
                );
                continue;
            };
            if !self.criteria.admits(&genome.taxon) {
                debug!(gene = %gene_id, taxon = %genome.taxon, "Gene dropped by taxon criteria");
                continue;
            }

            let mut occurrences: Vec<Occurrence> = hit
                .occurrences_in(&genome.id)
                .iter()
                .filter(|o| gene.span.map_or(true, |span| span.covers(o.coordinate, motif_len)))
                .cloned()
                .collect();
            occurrences.sort();

            let organism = gene.organism.clone().unwrap_or_else(|| genome.organism.clone());
            let record = best.get(gene_id);

            summaries.push(GeneSummary {
                gene_id: gene_id.clone(),
                organisms: BTreeSet::from([organism]),
                occurrence_count: occurrences.len(),
                genomes: BTreeSet::from([genome.id.clone()]),
                best_identity: record.map(|r| r.percent_identity),
                best_length: record.map(|r| r.alignment_length),
                occurrences,
            });
        }

        sort_gene_summaries(&mut summaries);

        if total_occurrences(&summaries) == 0 {
            return Err(HitError::EmptySearch {
                motif: hit.motif().to_string(),
            });
        }
        Ok(summaries)
    }

    /// Per-genome occurrence listing for the genomes passing the taxon criteria
    #[must_use]
    pub fn summarize_genomes(&self, hit: &Hit) -> Vec<GenomeSummary> {
        let mut summaries: Vec<GenomeSummary> = hit
            .genome_ids()
            .filter_map(|genome_id| {
                let Some(genome) = self.catalog.get(genome_id) else {
                    warn!(genome = %genome_id, "Occurrences on unknown genome, skipping");
                    return None;
                };
                if !self.criteria.admits(&genome.taxon) {
                    return None;
                }
                let mut occurrences = hit.occurrences_in(genome_id).to_vec();
                occurrences.sort();
                Some(GenomeSummary {
                    genome_id: genome.id.clone(),
                    organism: genome.organism.clone(),
                    taxon: genome.taxon.clone(),
                    occurrence_count: occurrences.len(),
                    occurrences,
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.occurrence_count
                .cmp(&a.occurrence_count)
                .then_with(|| a.genome_id.cmp(&b.genome_id))
        });
        summaries
    }
}

/// Drop summaries with fewer than `min` occurrences
#[must_use]
pub fn filter_on_gene_occurrences(summaries: Vec<GeneSummary>, min: usize) -> Vec<GeneSummary> {
    summaries
        .into_iter()
        .filter(|s| s.occurrence_count >= min)
        .collect()
}

/// Sum of occurrence counts
#[must_use]
pub fn total_occurrences(summaries: &[GeneSummary]) -> usize {
    summaries.iter().map(|s| s.occurrence_count).sum()
}

/// Descending occurrence count, ties by ascending gene id
fn sort_gene_summaries(summaries: &mut [GeneSummary]) {
    summaries.sort_by(|a, b| {
        b.occurrence_count
            .cmp(&a.occurrence_count)
            .then_with(|| a.gene_id.cmp(&b.gene_id))
    });
}
