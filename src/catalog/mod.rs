//! Genome and gene catalog storage.
//!
//! The catalog holds the indexed genomes (id, taxon, organism, size) and the
//! genes known on them. It is loaded once, never mutated afterwards, and passed
//! to the resolution components as a shared `Arc<GenomeCatalog>` handle.
//!
//! ## Compact indexes
//!
//! Each genome's position in the catalog is its *compact index*. Encoded
//! occurrences store this index rather than the full genome id, so the catalog
//! used to decode a shard must list genomes in the order the shard was built
//! against.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_hits::GenomeCatalog;
//! use crispr_hits::core::types::GenomeId;
//! use std::path::Path;
//!
//! let catalog = GenomeCatalog::load_from_file(Path::new("genomes.json")).unwrap();
//! let size = catalog.genome_size(&GenomeId::new("GCF_000217635.1"));
//! ```

pub mod builder;
pub mod genes;
pub mod store;
