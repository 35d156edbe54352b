use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::catalog::genes::GeneCatalog;
use crate::catalog::store::GenomeCatalog;
use crate::cli::OutputFormat;
use crate::codec::CodecLayout;
use crate::core::types::TaxonCriteria;
use crate::parsing::blast::{parse_report_file, AlignmentReport};
use crate::parsing::shard::{FileShardSource, ShardSource};
use crate::resolve::engine::{EngineConfig, ResolutionEngine, ResolutionSummary};
use crate::resolve::filter::FilterThresholds;
use crate::utils::validation::validate_motif;

#[derive(Args)]
pub struct ResolveArgs {
    /// Motif (guide sequence) to resolve
    #[arg(required = true)]
    pub motif: String,

    /// Path to genome catalog file
    #[arg(long, required = true)]
    pub catalog: PathBuf,

    /// Shard batch file(s) for the motif (.bin or .json, optionally .gz)
    #[arg(short, long = "shard", required = true, num_args = 1..)]
    pub shards: Vec<PathBuf>,

    /// Alignment report for the motif (BLAST -outfmt 6 or JSON, optionally .gz)
    #[arg(short, long, required = true)]
    pub report: PathBuf,

    /// Minimum percent identity for an alignment to qualify
    #[arg(long, default_value = "70")]
    pub min_identity: f64,

    /// Minimum alignment length for an alignment to qualify
    #[arg(long, default_value = "0")]
    pub min_length: u64,

    /// Maximum mismatches for an alignment to qualify
    #[arg(long)]
    pub max_mismatches: Option<u32>,

    /// Maximum e-value for an alignment to qualify
    #[arg(long)]
    pub max_evalue: Option<f64>,

    /// Drop genes with fewer occurrences
    #[arg(long, default_value = "1")]
    pub min_gene_occurrences: usize,

    /// Only report genes on genomes of these taxa (repeatable)
    #[arg(long = "include-taxon")]
    pub include_taxa: Vec<String>,

    /// Never report genes on genomes of these taxa (repeatable)
    #[arg(long = "exclude-taxon")]
    pub exclude_taxa: Vec<String>,

    /// Seconds to wait for each shard
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Coordinate width the shards were encoded with
    #[arg(long, default_value = "22", value_parser = clap::value_parser!(u8).range(1..=48))]
    pub coordinate_bits: u8,

    /// List every occurrence in text output
    #[arg(long)]
    pub show_occurrences: bool,
}

impl ResolveArgs {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        Ok(EngineConfig {
            layout: CodecLayout::new(self.coordinate_bits)?,
            thresholds: FilterThresholds {
                min_identity: self.min_identity,
                min_length: self.min_length,
                max_mismatches: self.max_mismatches,
                max_evalue: self.max_evalue,
            },
            min_gene_occurrences: self.min_gene_occurrences,
            shard_timeout: Duration::from_secs(self.timeout_secs),
            taxa: TaxonCriteria::new(&self.include_taxa, &self.exclude_taxa),
        })
    }
}

/// Execute resolve subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read or every shard fails. An
/// empty search is reported as an empty result, not an error.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ResolveArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let motif = validate_motif(&args.motif)?;
    let config = args.engine_config()?;

    let catalog = Arc::new(GenomeCatalog::load_from_file(&args.catalog)?);
    let report = parse_report_file(&args.report)?;

    if verbose {
        eprintln!(
            "Loaded catalog with {} genomes, report with {} alignments, {} shards",
            catalog.len(),
            report.len(),
            args.shards.len()
        );
    }

    let shards: Vec<Arc<dyn ShardSource>> = args
        .shards
        .iter()
        .map(|path| Arc::new(FileShardSource::new(path)) as Arc<dyn ShardSource>)
        .collect();

    let genes = catalog.genes.clone();
    let searched = catalog
        .genomes
        .iter()
        .filter(|g| config.taxa.admits(&g.taxon))
        .count();
    let engine = ResolutionEngine::new(Arc::clone(&catalog), config);

    let summary = resolve_summary(&engine, &motif, shards, &report, &genes, searched)?;

    for warning in &summary.warnings {
        eprintln!("Warning: {warning}");
    }

    match format {
        OutputFormat::Text => print_text_summary(&summary, args.show_occurrences, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Tsv => print_tsv_summary(&summary),
    }

    Ok(())
}

/// Run the engine on a fresh runtime and turn an empty search into an empty
/// summary
///
/// The runtime is shut down without waiting on fetches abandoned after a
/// shard timeout, so a hung shard cannot hold the command past its timeout.
fn resolve_summary(
    engine: &ResolutionEngine,
    motif: &str,
    shards: Vec<Arc<dyn ShardSource>>,
    report: &AlignmentReport,
    genes: &GeneCatalog,
    searched: usize,
) -> anyhow::Result<ResolutionSummary> {
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(engine.resolve(motif, shards, report, genes));
    rt.shutdown_background();

    match result {
        Ok(summary) => Ok(summary),
        Err(e) if e.is_empty_result() => {
            let mut summary = ResolutionSummary::empty(motif);
            summary.genomes_searched_count = searched;
            summary.warnings.push(e.to_string());
            Ok(summary)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_text_summary(summary: &ResolutionSummary, show_occurrences: bool, verbose: bool) {
    println!("Motif: {}", summary.motif);
    println!(
        "Genomes searched: {}  Occurrences: {} on genes / {} merged{}",
        summary.genomes_searched_count,
        summary.total_occurrences,
        summary.merged_occurrences,
        if summary.partial { "  (PARTIAL)" } else { "" }
    );

    if summary.genes.is_empty() {
        println!("\nNo gene hits");
        return;
    }

    let id_width = summary
        .genes
        .iter()
        .map(|g| g.gene_id.as_str().len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!();
    println!(
        "{:<id_w$} {:>11} {:>9}  Organisms",
        "Gene",
        "Occurrences",
        "Identity",
        id_w = id_width
    );
    println!("{}", "-".repeat(id_width + 11 + 9 + 14));

    for gene in &summary.genes {
        let identity = gene
            .best_identity
            .map_or_else(|| "-".to_string(), |i| format!("{i:.1}%"));
        println!(
            "{:<id_w$} {:>11} {:>9}  {}",
            gene.gene_id.as_str(),
            gene.occurrence_count,
            identity,
            gene.organisms.iter().cloned().collect::<Vec<_>>().join(", "),
            id_w = id_width
        );
        if show_occurrences {
            for occurrence in &gene.occurrences {
                println!("    {occurrence}");
            }
        }
    }

    if verbose && !summary.genomes.is_empty() {
        println!("\nGenomes:");
        for genome in &summary.genomes {
            println!(
                "  {} ({}; {}): {} occurrences",
                genome.genome_id, genome.organism, genome.taxon, genome.occurrence_count
            );
        }
    }
}

fn print_tsv_summary(summary: &ResolutionSummary) {
    println!("motif\tgene_id\toccurrences\tgenomes\torganisms\tbest_identity\tbest_length");
    for gene in &summary.genes {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            summary.motif,
            gene.gene_id,
            gene.occurrence_count,
            gene.genomes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
            gene.organisms.iter().cloned().collect::<Vec<_>>().join(";"),
            gene.best_identity
                .map_or_else(String::new, |i| format!("{i:.2}")),
            gene.best_length.map_or_else(String::new, |l| l.to_string()),
        );
    }
}
