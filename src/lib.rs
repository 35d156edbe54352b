//! # crispr-hits
//!
//! A library for resolving where a CRISPR guide motif occurs across a large
//! collection of indexed genomes, and which of those occurrences are genuine
//! gene hits.
//!
//! Genome indexes are split into shards that are searched independently. Each
//! shard returns its occurrences as packed 64-bit values. `crispr-hits` decodes
//! and merges them, cross-checks the candidate genes against an alignment
//! (BLAST) report, and aggregates the confirmed hits per gene and per genome.
//!
//! ## Features
//!
//! - **Compact occurrence codec**: genome index, strand, and coordinate in one
//!   `u64`, with a per-shard long table for large coordinates
//! - **Concurrent merging**: shard results merge into one deduplicated,
//!   deterministically ordered hit
//! - **Alignment filtering**: inclusive identity, length, mismatch, and e-value
//!   thresholds
//! - **Taxon filters**: include and exclude lists, exclusion wins
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_hits::{GenomeCatalog, ResolutionEngine, EngineConfig};
//! use crispr_hits::parsing::blast::parse_report_file;
//! use crispr_hits::parsing::shard::read_shard_file;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(GenomeCatalog::load_from_file(Path::new("genomes.json")).unwrap());
//! let report = parse_report_file(Path::new("sgRNA_1.blast.tsv")).unwrap();
//! let batch = read_shard_file(Path::new("shard-01.bin")).unwrap();
//!
//! let genes = catalog.genes.clone();
//! let engine = ResolutionEngine::new(Arc::clone(&catalog), EngineConfig::default());
//! let summary = engine
//!     .resolve_batches("GGCATCGATCGATCGATCGAAGG", &[batch], &report, &genes)
//!     .unwrap();
//!
//! for gene in &summary.genes {
//!     println!("{}: {} occurrences", gene.gene_id, gene.occurrence_count);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Genome and gene catalog storage
//! - [`codec`]: Packed occurrence encoding
//! - [`core`]: Core data types and the resolution error type
//! - [`resolve`]: Merger, alignment filter, aggregator, and engine
//! - [`parsing`]: Alignment report and shard batch readers
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod core;
pub mod parsing;
pub mod resolve;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::store::GenomeCatalog;
pub use codec::{CodecLayout, LongTable, OccurrenceCodec};
pub use core::error::HitError;
pub use core::occurrence::Occurrence;
pub use core::types::*;
pub use resolve::engine::{EngineConfig, ResolutionEngine, ResolutionSummary};
pub use resolve::merger::Hit;
