use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::catalog::genes::{GeneCatalog, GeneRef};
use crate::catalog::store::GenomeCatalog;
use crate::codec::{CodecLayout, OccurrenceCodec};
use crate::core::error::HitError;
use crate::core::types::{GenomeId, TaxonCriteria};
use crate::parsing::blast::AlignmentReport;
use crate::parsing::shard::{ShardBatch, ShardSource};
use crate::resolve::aggregate::{
    filter_on_gene_occurrences, total_occurrences, GeneSummary, GenomeSummary, ResultAggregator,
};
use crate::resolve::filter::{AlignmentFilter, FilterThresholds};
use crate::resolve::merger::{Hit, MergeStats, SharedHit};

/// Default time allowed for one shard to deliver its batch
pub const DEFAULT_SHARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum number of occurrences for a gene to be reported
pub const DEFAULT_MIN_GENE_OCCURRENCES: usize = 1;

/// Configuration for the resolution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Occurrence codec layout the shards were encoded with
    pub layout: CodecLayout,
    /// Alignment qualification thresholds
    pub thresholds: FilterThresholds,
    /// Genes with fewer occurrences are dropped from the summary
    pub min_gene_occurrences: usize,
    /// Per-shard fetch timeout
    pub shard_timeout: Duration,
    /// Taxon inclusion/exclusion
    pub taxa: TaxonCriteria,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: CodecLayout::default(),
            thresholds: FilterThresholds::default(),
            min_gene_occurrences: DEFAULT_MIN_GENE_OCCURRENCES,
            shard_timeout: DEFAULT_SHARD_TIMEOUT,
            taxa: TaxonCriteria::default(),
        }
    }
}

/// Final output of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub motif: String,
    pub genes: Vec<GeneSummary>,
    pub genomes: Vec<GenomeSummary>,
    /// Occurrences counted across the reported genes
    pub total_occurrences: usize,
    /// Distinct occurrences merged from all shards
    pub merged_occurrences: usize,
    /// Catalog genomes admitted by the taxon criteria
    pub genomes_searched_count: usize,
    /// Admitted genomes without a qualifying alignment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genomes_without_homolog: Vec<GenomeId>,
    /// True if at least one shard failed or timed out
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResolutionSummary {
    /// Summary with no genes, used for an `EmptySearch` outcome
    pub fn empty(motif: impl Into<String>) -> Self {
        Self {
            motif: motif.into(),
            genes: Vec::new(),
            genomes: Vec::new(),
            total_occurrences: 0,
            merged_occurrences: 0,
            genomes_searched_count: 0,
            genomes_without_homolog: Vec::new(),
            partial: false,
            warnings: Vec::new(),
        }
    }
}

/// Result of one shard task
enum ShardOutcome {
    Merged {
        shard_id: String,
        stats: MergeStats,
        errors: Vec<HitError>,
    },
    Failed {
        shard_id: String,
        reason: String,
    },
}

/// Resolves motif queries against a shared genome catalog
pub struct ResolutionEngine {
    catalog: Arc<GenomeCatalog>,
    config: EngineConfig,
}

impl ResolutionEngine {
    pub fn new(catalog: Arc<GenomeCatalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn codec(&self) -> OccurrenceCodec {
        OccurrenceCodec::new(Arc::clone(&self.catalog), self.config.layout)
    }

    /// Resolve a motif across shards fetched concurrently.
    ///
    /// Each shard is fetched on the blocking pool under the configured timeout,
    /// then decoded and merged into one shared hit. A shard that fails, times
    /// out, or has every value rejected by the codec marks the summary as
    /// partial.
    ///
    /// # Errors
    ///
    /// Returns `HitError::ConsistencyError` if every shard failed, or
    /// `HitError::EmptySearch` if no occurrences survive filtering.
    pub async fn resolve(
        &self,
        query: &str,
        shards: Vec<Arc<dyn ShardSource>>,
        report: &AlignmentReport,
        genes: &GeneCatalog,
    ) -> Result<ResolutionSummary, HitError> {
        let shard_count = shards.len();
        let shared = Arc::new(SharedHit::new(query));
        let codec = Arc::new(self.codec());
        let mut tasks = JoinSet::new();

        for shard in shards {
            let shared = Arc::clone(&shared);
            let codec = Arc::clone(&codec);
            let catalog = Arc::clone(&self.catalog);
            let motif = query.to_string();
            let timeout = self.config.shard_timeout;

            tasks.spawn(async move {
                let shard_id = shard.shard_id().to_string();
                let fetch = tokio::task::spawn_blocking(move || shard.fetch(&motif));

                let batch = match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(Ok(batch))) => batch,
                    Ok(Ok(Err(e))) => {
                        return ShardOutcome::Failed {
                            shard_id,
                            reason: e.to_string(),
                        }
                    }
                    Ok(Err(e)) => {
                        return ShardOutcome::Failed {
                            shard_id,
                            reason: e.to_string(),
                        }
                    }
                    Err(_) => {
                        return ShardOutcome::Failed {
                            shard_id,
                            reason: format!("timed out after {}ms", timeout.as_millis()),
                        }
                    }
                };

                let merged = tokio::task::spawn_blocking(move || {
                    let decoded = codec.decode_batch(&batch.values, &batch.long_table);
                    let stats = shared.merge(decoded.occurrences, &catalog);
                    (stats, decoded.errors)
                })
                .await;

                match merged {
                    Ok((stats, errors)) => ShardOutcome::Merged {
                        shard_id,
                        stats,
                        errors,
                    },
                    Err(e) => ShardOutcome::Failed {
                        shard_id,
                        reason: e.to_string(),
                    },
                }
            });
        }

        let mut warnings = Vec::new();
        let mut failed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(ShardOutcome::Merged {
                    shard_id,
                    stats,
                    errors,
                }) => {
                    debug!(
                        shard = %shard_id,
                        added = stats.added,
                        duplicates = stats.duplicates,
                        skipped = stats.skipped,
                        dropped = errors.len(),
                        "Merged shard"
                    );
                    if record_shard(&shard_id, stats, &errors, &mut warnings) {
                        failed += 1;
                    }
                }
                Ok(ShardOutcome::Failed { shard_id, reason }) => {
                    warn!(shard = %shard_id, reason = %reason, "Shard failed");
                    warnings.push(format!("Shard {shard_id} failed: {reason}"));
                    failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Shard task aborted");
                    warnings.push(format!("Shard task aborted: {e}"));
                    failed += 1;
                }
            }
        }

        check_shards_failed(query, shard_count, failed)?;

        let hit = match Arc::try_unwrap(shared) {
            Ok(shared) => shared.into_hit(),
            Err(shared) => shared.snapshot(),
        };

        self.finish(&hit, report, genes, failed > 0, warnings)
    }

    /// Resolve a motif from batches that were already fetched
    ///
    /// # Errors
    ///
    /// Returns `HitError::ConsistencyError` if the codec rejected every value
    /// of every non-empty batch, or `HitError::EmptySearch` if no occurrences
    /// survive filtering.
    pub fn resolve_batches(
        &self,
        query: &str,
        batches: &[ShardBatch],
        report: &AlignmentReport,
        genes: &GeneCatalog,
    ) -> Result<ResolutionSummary, HitError> {
        let codec = self.codec();
        let mut hit = Hit::new(query);
        let mut warnings = Vec::new();
        let mut failed = 0usize;

        for batch in batches {
            let decoded = codec.decode_batch(&batch.values, &batch.long_table);
            let stats = hit.merge(decoded.occurrences, &self.catalog);
            if record_shard(&batch.shard_id, stats, &decoded.errors, &mut warnings) {
                failed += 1;
            }
        }

        check_shards_failed(query, batches.len(), failed)?;
        self.finish(&hit, report, genes, failed > 0, warnings)
    }

    /// Filter, aggregate, and summarize a merged hit
    fn finish(
        &self,
        hit: &Hit,
        report: &AlignmentReport,
        genes: &GeneCatalog,
        partial: bool,
        mut warnings: Vec<String>,
    ) -> Result<ResolutionSummary, HitError> {
        let filter = AlignmentFilter::with_thresholds(&self.catalog, self.config.thresholds);

        let qualifying = match filter.filter_genes(report) {
            Ok(genes) => genes,
            Err(e @ HitError::NoBlastHit { .. }) => {
                info!(motif = %hit.motif(), "No alignment hit");
                warnings.push(e.to_string());
                BTreeSet::new()
            }
            Err(e) => return Err(e),
        };
        let best = filter.best_hits(report);

        // Genes named only by the report lie on their subject genome, spanning
        // the best qualifying alignment
        let mut gene_catalog = genes.clone();
        for (gene_id, record) in &best {
            if gene_catalog.get(gene_id).is_none() {
                let mut gene = GeneRef::new(gene_id.as_str(), record.subject_genome_id.as_str());
                gene.span = record.span();
                gene_catalog.insert(gene);
            }
        }

        let included: Vec<&GenomeId> = self
            .catalog
            .genomes
            .iter()
            .filter(|g| self.config.taxa.admits(&g.taxon))
            .map(|g| &g.id)
            .collect();
        let genomes_without_homolog = if qualifying.is_empty() {
            Vec::new()
        } else {
            filter.missing_genomes(report, included.iter().copied())
        };
        if !genomes_without_homolog.is_empty() {
            debug!(
                count = genomes_without_homolog.len(),
                "Included genomes without a qualifying alignment"
            );
            warnings.push(format!(
                "{} included genomes have no qualifying alignment",
                genomes_without_homolog.len()
            ));
        }

        let aggregator = ResultAggregator::new(&self.catalog, &gene_catalog, &self.config.taxa);
        let summaries = aggregator.aggregate(hit, &qualifying, &best)?;
        let gene_summaries =
            filter_on_gene_occurrences(summaries, self.config.min_gene_occurrences);

        let total = total_occurrences(&gene_summaries);
        if total == 0 {
            return Err(HitError::EmptySearch {
                motif: hit.motif().to_string(),
            });
        }

        let genomes = aggregator.summarize_genomes(hit);

        info!(
            motif = %hit.motif(),
            genes = gene_summaries.len(),
            total_occurrences = total,
            partial,
            "Resolved motif"
        );

        Ok(ResolutionSummary {
            motif: hit.motif().to_string(),
            genes: gene_summaries,
            genomes,
            total_occurrences: total,
            merged_occurrences: hit.number_occurrences(),
            genomes_searched_count: included.len(),
            genomes_without_homolog,
            partial,
            warnings,
        })
    }
}

/// Record the warnings of a merged shard. Returns true if the shard failed:
/// it delivered values but the codec rejected every one of them.
fn record_shard(
    shard_id: &str,
    stats: MergeStats,
    errors: &[HitError],
    warnings: &mut Vec<String>,
) -> bool {
    if stats.received() == 0 && errors.iter().any(HitError::is_consistency) {
        warn!(shard = %shard_id, dropped = errors.len(), "Shard inconsistent with catalog");
        warnings.push(format!(
            "Shard {shard_id} failed: all {} values inconsistent with the catalog",
            errors.len()
        ));
        return true;
    }
    if let Some(warning) = shard_warning(shard_id, stats, errors) {
        warnings.push(warning);
    }
    false
}

/// A query fails only when every one of its shards failed
fn check_shards_failed(query: &str, shard_count: usize, failed: usize) -> Result<(), HitError> {
    if shard_count > 0 && failed == shard_count {
        return Err(HitError::ConsistencyError(format!(
            "All {shard_count} shards failed for motif {query}"
        )));
    }
    Ok(())
}

/// Warning line for a shard that dropped occurrences, if any were dropped
fn shard_warning(shard_id: &str, stats: MergeStats, errors: &[HitError]) -> Option<String> {
    if errors.is_empty() && stats.skipped == 0 {
        return None;
    }
    let consistency = errors.iter().filter(|e| e.is_consistency()).count();
    let dropped = errors.len() + stats.skipped;
    Some(format!(
        "Shard {shard_id}: dropped {dropped} occurrences \
         ({consistency} consistency errors, {} unknown genomes)",
        stats.skipped
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::make_test_catalog;
    use crate::core::occurrence::Occurrence;
    use crate::core::types::Strand;
    use crate::parsing::blast::{AlignmentRecord, ParseError};

    struct SlowShard;

    impl ShardSource for SlowShard {
        fn shard_id(&self) -> &str {
            "slow"
        }

        fn fetch(&self, _motif: &str) -> Result<ShardBatch, ParseError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(ShardBatch::new("slow"))
        }
    }

    struct BrokenShard;

    impl ShardSource for BrokenShard {
        fn shard_id(&self) -> &str {
            "broken"
        }

        fn fetch(&self, _motif: &str) -> Result<ShardBatch, ParseError> {
            Err(ParseError::InvalidFormat("truncated".to_string()))
        }
    }

    fn engine() -> ResolutionEngine {
        let config = EngineConfig {
            thresholds: FilterThresholds::new(95.0, 18),
            shard_timeout: Duration::from_millis(50),
            ..EngineConfig::default()
        };
        ResolutionEngine::new(Arc::new(make_test_catalog()), config)
    }

    fn batches(engine: &ResolutionEngine) -> (ShardBatch, ShardBatch) {
        let codec = engine.codec();
        let first = ShardBatch::from_occurrences(
            "shard-1",
            &[
                Occurrence::new("G1", 42, Strand::Forward),
                Occurrence::new("G1", 42, Strand::Forward),
            ],
            &codec,
        )
        .unwrap();
        let second = ShardBatch::from_occurrences(
            "shard-2",
            &[Occurrence::new("G2", 4_999_999, Strand::Reverse)],
            &codec,
        )
        .unwrap();
        (first, second)
    }

    fn report() -> AlignmentReport {
        [
            AlignmentRecord::new("G1", "geneA", 98.0, 20),
            AlignmentRecord::new("G2", "geneB", 80.0, 20),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_batches_either_order() {
        let engine = engine();
        let (first, second) = batches(&engine);

        for order in [
            vec![first.clone(), second.clone()],
            vec![second.clone(), first.clone()],
        ] {
            let summary = engine
                .resolve_batches("ACGT", &order, &report(), &GeneCatalog::new())
                .unwrap();
            assert_eq!(summary.merged_occurrences, 2);
            assert_eq!(summary.genes.len(), 1);
            assert_eq!(summary.genes[0].gene_id.as_str(), "geneA");
            assert_eq!(summary.total_occurrences, 1);
            assert_eq!(summary.genomes_searched_count, 2);
            assert_eq!(summary.genomes_without_homolog, vec![GenomeId::new("G2")]);
            assert!(!summary.partial);
        }
    }

    #[test]
    fn test_empty_report_is_empty_search() {
        let engine = engine();
        let (first, second) = batches(&engine);

        let result = engine.resolve_batches(
            "ACGT",
            &[first, second],
            &AlignmentReport::new("ACGT"),
            &GeneCatalog::new(),
        );
        assert!(matches!(result, Err(HitError::EmptySearch { .. })));
    }

    #[tokio::test]
    async fn test_resolve_concurrent_shards() {
        let engine = engine();
        let (first, second) = batches(&engine);
        let shards: Vec<Arc<dyn ShardSource>> = vec![Arc::new(first), Arc::new(second)];

        let summary = engine
            .resolve("ACGT", shards, &report(), &GeneCatalog::new())
            .await
            .unwrap();
        assert_eq!(summary.merged_occurrences, 2);
        assert_eq!(summary.total_occurrences, 1);
        assert_eq!(summary.genomes.len(), 2);
        assert!(!summary.partial);
    }

    #[tokio::test]
    async fn test_failed_and_slow_shards_are_partial() {
        let engine = engine();
        let (first, _) = batches(&engine);
        let shards: Vec<Arc<dyn ShardSource>> =
            vec![Arc::new(first), Arc::new(SlowShard), Arc::new(BrokenShard)];

        let summary = engine
            .resolve("ACGT", shards, &report(), &GeneCatalog::new())
            .await
            .unwrap();
        assert!(summary.partial);
        assert_eq!(summary.total_occurrences, 1);
        assert!(summary.warnings.iter().any(|w| w.contains("slow")));
        assert!(summary.warnings.iter().any(|w| w.contains("broken")));
    }

    #[tokio::test]
    async fn test_all_shards_failed() {
        let engine = engine();
        let shards: Vec<Arc<dyn ShardSource>> = vec![Arc::new(BrokenShard), Arc::new(SlowShard)];

        let result = engine
            .resolve("ACGT", shards, &report(), &GeneCatalog::new())
            .await;
        assert!(matches!(result, Err(HitError::ConsistencyError(_))));
    }

    #[test]
    fn test_missing_long_entry_is_warned() {
        let engine = engine();
        let (first, second) = batches(&engine);
        let mut mixed = first.clone();
        mixed.values.extend(second.values.iter().copied());

        let summary = engine
            .resolve_batches("ACGT", &[mixed], &report(), &GeneCatalog::new())
            .unwrap();
        assert_eq!(summary.merged_occurrences, 1);
        assert!(!summary.partial);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("1 consistency errors")));
    }

    #[test]
    fn test_inconsistent_shard_marks_partial() {
        let engine = engine();
        let (first, mut second) = batches(&engine);
        second.long_table = Default::default();

        let summary = engine
            .resolve_batches("ACGT", &[first, second], &report(), &GeneCatalog::new())
            .unwrap();
        assert!(summary.partial);
        assert_eq!(summary.merged_occurrences, 1);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("shard-2 failed")));
    }

    fn inconsistent_batches(engine: &ResolutionEngine) -> Vec<ShardBatch> {
        let (_, second) = batches(engine);
        ["shard-a", "shard-b"]
            .into_iter()
            .map(|id| ShardBatch {
                shard_id: id.to_string(),
                values: second.values.clone(),
                long_table: Default::default(),
            })
            .collect()
    }

    #[test]
    fn test_all_batches_inconsistent_is_consistency_error() {
        let engine = engine();
        let batches = inconsistent_batches(&engine);

        let result = engine.resolve_batches("ACGT", &batches, &report(), &GeneCatalog::new());
        assert!(matches!(result, Err(HitError::ConsistencyError(_))));
    }

    #[tokio::test]
    async fn test_all_shards_inconsistent_is_consistency_error() {
        let engine = engine();
        let shards: Vec<Arc<dyn ShardSource>> = inconsistent_batches(&engine)
            .into_iter()
            .map(|b| Arc::new(b) as Arc<dyn ShardSource>)
            .collect();

        let result = engine
            .resolve("ACGT", shards, &report(), &GeneCatalog::new())
            .await;
        assert!(matches!(result, Err(HitError::ConsistencyError(_))));
    }

    #[test]
    fn test_empty_shard_is_not_a_failure() {
        let engine = engine();
        let (first, _) = batches(&engine);

        let summary = engine
            .resolve_batches(
                "ACGT",
                &[first, ShardBatch::new("empty")],
                &report(),
                &GeneCatalog::new(),
            )
            .unwrap();
        assert!(!summary.partial);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"min_gene_occurrences": 3}"#).unwrap();
        assert_eq!(config.min_gene_occurrences, 3);
        assert_eq!(config.layout, CodecLayout::default());
        assert_eq!(config.shard_timeout, DEFAULT_SHARD_TIMEOUT);
    }
}
