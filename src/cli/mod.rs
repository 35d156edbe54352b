//! Command-line interface for crispr-hits.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **resolve**: Resolve a motif's occurrences into gene and genome summaries
//! - **decode**: Decode raw encoded occurrence values against a catalog
//! - **catalog**: List, show, or build genome catalog entries
//!
//! ## Usage
//!
//! ```text
//! # Resolve a guide across two shards, confirmed by a BLAST report
//! crispr-hits resolve GGCATCGATCGATCGATCGAAGG --catalog genomes.json \
//!     -s shard-01.bin -s shard-02.bin -r sgRNA_1.blast.tsv --min-identity 95
//!
//! # JSON output for scripting
//! crispr-hits --format json resolve ...
//!
//! # Inspect a shard
//! crispr-hits decode --catalog genomes.json --shard shard-01.bin
//!
//! # Add a genome to a catalog from its FASTA index
//! crispr-hits catalog build --id GCF_000217635.1 --taxon "Buchnera aphidicola" \
//!     -i GCF_000217635.1.fna.fai --append-to genomes.json
//! ```

use clap::{Parser, Subcommand};

pub mod catalog;
pub mod decode;
pub mod resolve;

#[derive(Parser)]
#[command(name = "crispr-hits")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Resolve CRISPR motif occurrences into gene and taxon hits")]
#[command(
    long_about = "crispr-hits merges the encoded motif occurrences produced by independent genome shards, confirms them against an alignment (BLAST) report, and aggregates the surviving hits into gene- and genome-level summaries.\n\nIt provides:\n- Deterministic, deduplicated merging across shards\n- Identity/length/mismatch/e-value thresholds on alignments\n- Taxon inclusion and exclusion filters"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a motif's occurrences into gene and genome summaries
    Resolve(resolve::ResolveArgs),

    /// Decode encoded occurrence values
    Decode(decode::DecodeArgs),

    /// Manage the genome catalog
    Catalog(catalog::CatalogArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
