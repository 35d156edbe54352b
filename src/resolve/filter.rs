use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::catalog::store::GenomeCatalog;
use crate::core::error::HitError;
use crate::core::types::{GeneId, GenomeId};
use crate::parsing::blast::{AlignmentRecord, AlignmentReport};

/// Default minimum percent identity for a record to qualify
pub const DEFAULT_MIN_IDENTITY: f64 = 70.0;

/// Per-record qualification thresholds. Every bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterThresholds {
    /// Minimum percent identity
    pub min_identity: f64,
    /// Minimum alignment length
    pub min_length: u64,
    /// Maximum number of mismatches (off when `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mismatches: Option<u32>,
    /// Maximum e-value (off when `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evalue: Option<f64>,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            min_identity: DEFAULT_MIN_IDENTITY,
            min_length: 0,
            max_mismatches: None,
            max_evalue: None,
        }
    }
}

impl FilterThresholds {
    pub fn new(min_identity: f64, min_length: u64) -> Self {
        Self {
            min_identity,
            min_length,
            ..Self::default()
        }
    }

    /// Check whether a single record qualifies
    #[must_use]
    pub fn qualifies(&self, record: &AlignmentRecord) -> bool {
        record.percent_identity >= self.min_identity
            && record.alignment_length >= self.min_length
            && self.max_mismatches.map_or(true, |max| record.mismatches <= max)
            && self.max_evalue.map_or(true, |max| record.evalue <= max)
    }
}

/// Ordering of two records for display: higher identity, then longer
/// alignment, then lower e-value is better
fn compare_records(a: &AlignmentRecord, b: &AlignmentRecord) -> Ordering {
    a.percent_identity
        .total_cmp(&b.percent_identity)
        .then(a.alignment_length.cmp(&b.alignment_length))
        .then(b.evalue.total_cmp(&a.evalue))
}

/// Decides which genes of an alignment report are confirmed hits
pub struct AlignmentFilter<'a> {
    catalog: &'a GenomeCatalog,
    thresholds: FilterThresholds,
}

impl<'a> AlignmentFilter<'a> {
    /// Create a filter with default thresholds
    pub fn new(catalog: &'a GenomeCatalog) -> Self {
        Self {
            catalog,
            thresholds: FilterThresholds::default(),
        }
    }

    pub fn with_thresholds(catalog: &'a GenomeCatalog, thresholds: FilterThresholds) -> Self {
        Self {
            catalog,
            thresholds,
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &FilterThresholds {
        &self.thresholds
    }

    fn qualifying<'r>(
        &self,
        report: &'r AlignmentReport,
    ) -> impl Iterator<Item = &'r AlignmentRecord> + 'r {
        let thresholds = self.thresholds;
        report.records().filter(move |r| thresholds.qualifies(r))
    }

    /// Genes with at least one qualifying record
    ///
    /// # Errors
    ///
    /// Returns `HitError::NoBlastHit` if the report has no records at all.
    pub fn filter_genes(&self, report: &AlignmentReport) -> Result<BTreeSet<GeneId>, HitError> {
        if report.is_empty() {
            return Err(HitError::NoBlastHit {
                motif: report.query().to_string(),
            });
        }

        let genes: BTreeSet<GeneId> = self
            .qualifying(report)
            .map(|r| r.gene_id.clone())
            .collect();

        debug!(
            records = report.len(),
            qualifying_genes = genes.len(),
            "Filtered alignment report"
        );
        Ok(genes)
    }

    /// True if at least one gene qualifies
    #[must_use]
    pub fn is_hit(&self, report: &AlignmentReport) -> bool {
        self.filter_genes(report).is_ok_and(|genes| !genes.is_empty())
    }

    /// Organisms of the qualifying records.
    ///
    /// The gene's own organism is used when the catalog knows the gene,
    /// otherwise the subject genome's. Unknown subjects are skipped.
    #[must_use]
    pub fn organisms(&self, report: &AlignmentReport) -> BTreeSet<String> {
        let mut organisms = BTreeSet::new();

        for record in self.qualifying(report) {
            let organism = self.catalog.organism(&record.gene_id).or_else(|| {
                self.catalog
                    .get(&record.subject_genome_id)
                    .map(|g| g.organism.as_str())
            });
            match organism {
                Some(name) => {
                    organisms.insert(name.to_string());
                }
                None => {
                    warn!(
                        genome = %record.subject_genome_id,
                        gene = %record.gene_id,
                        "Alignment subject not in catalog, skipping"
                    );
                }
            }
        }

        organisms
    }

    /// Best qualifying record per gene
    #[must_use]
    pub fn best_hits<'r>(
        &self,
        report: &'r AlignmentReport,
    ) -> BTreeMap<GeneId, &'r AlignmentRecord> {
        let mut best: BTreeMap<GeneId, &AlignmentRecord> = BTreeMap::new();

        for record in self.qualifying(report) {
            best.entry(record.gene_id.clone())
                .and_modify(|current| {
                    if compare_records(record, *current) == Ordering::Greater {
                        *current = record;
                    }
                })
                .or_insert(record);
        }

        best
    }

    /// Genomes from `included` with no qualifying record in the report
    #[must_use]
    pub fn missing_genomes<'g, I>(&self, report: &AlignmentReport, included: I) -> Vec<GenomeId>
    where
        I: IntoIterator<Item = &'g GenomeId>,
    {
        included
            .into_iter()
            .filter(|&id| {
                !report
                    .subject_records(id)
                    .iter()
                    .any(|r| self.thresholds.qualifies(r))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::genes::GeneRef;
    use crate::catalog::store::make_test_catalog;

    fn report() -> AlignmentReport {
        [
            AlignmentRecord::new("G1", "geneA", 98.0, 20),
            AlignmentRecord::new("G2", "geneB", 80.0, 20),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_filter_genes_scenario() {
        let catalog = make_test_catalog();
        let filter = AlignmentFilter::with_thresholds(&catalog, FilterThresholds::new(95.0, 18));

        let genes = filter.filter_genes(&report()).unwrap();
        assert_eq!(genes.into_iter().collect::<Vec<_>>(), vec![GeneId::new("geneA")]);
        assert!(filter.is_hit(&report()));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let thresholds = FilterThresholds::new(95.0, 18);

        assert!(thresholds.qualifies(&AlignmentRecord::new("G1", "a", 95.0, 18)));
        assert!(!thresholds.qualifies(&AlignmentRecord::new("G1", "a", 94.99, 18)));
        assert!(!thresholds.qualifies(&AlignmentRecord::new("G1", "a", 95.0, 17)));
    }

    #[test]
    fn test_optional_ceilings() {
        let thresholds = FilterThresholds {
            max_mismatches: Some(2),
            max_evalue: Some(0.01),
            ..FilterThresholds::new(0.0, 0)
        };
        let base = AlignmentRecord::new("G1", "a", 90.0, 20);

        assert!(thresholds.qualifies(&base.clone().with_mismatches(2).with_evalue(0.01)));
        assert!(!thresholds.qualifies(&base.clone().with_mismatches(3)));
        assert!(!thresholds.qualifies(&base.with_evalue(0.02)));
    }

    #[test]
    fn test_empty_report_is_no_blast_hit() {
        let catalog = make_test_catalog();
        let filter = AlignmentFilter::new(&catalog);
        let empty = AlignmentReport::new("ACGT");

        assert_eq!(
            filter.filter_genes(&empty),
            Err(HitError::NoBlastHit {
                motif: "ACGT".to_string()
            })
        );
        assert!(!filter.is_hit(&empty));
    }

    #[test]
    fn test_organisms_of_qualifying_records() {
        let mut catalog = make_test_catalog();
        catalog
            .add_gene(GeneRef::new("geneA", "G1").with_organism("Organism one, strain X"))
            .unwrap();
        let filter = AlignmentFilter::with_thresholds(&catalog, FilterThresholds::new(75.0, 0));

        let mut report = report();
        report.push(AlignmentRecord::new("G9", "geneZ", 99.0, 20));

        let organisms: Vec<String> = filter.organisms(&report).into_iter().collect();
        assert_eq!(organisms, vec!["Organism one, strain X", "Organism two"]);
    }

    #[test]
    fn test_best_hits() {
        let catalog = make_test_catalog();
        let filter = AlignmentFilter::with_thresholds(&catalog, FilterThresholds::new(0.0, 0));
        let report: AlignmentReport = [
            AlignmentRecord::new("G1", "geneA", 90.0, 20).with_evalue(0.1),
            AlignmentRecord::new("G1", "geneA", 95.0, 18),
            AlignmentRecord::new("G1", "geneA", 95.0, 20).with_evalue(0.5),
            AlignmentRecord::new("G1", "geneA", 95.0, 20).with_evalue(0.01),
        ]
        .into_iter()
        .collect();

        let best = filter.best_hits(&report);
        let record = best[&GeneId::new("geneA")];
        assert_eq!(record.alignment_length, 20);
        assert!((record.evalue - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_genomes() {
        let catalog = make_test_catalog();
        let filter = AlignmentFilter::with_thresholds(&catalog, FilterThresholds::new(95.0, 0));
        let included = [GenomeId::new("G1"), GenomeId::new("G2")];

        let missing = filter.missing_genomes(&report(), &included);
        assert_eq!(missing, vec![GenomeId::new("G2")]);
    }
}
