//! Core data types for motif occurrence resolution.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`GenomeRef`](genome::GenomeRef): An indexed genome with taxon, organism and size
//! - [`Occurrence`](occurrence::Occurrence): One (genome, coordinate, strand) location of a motif
//! - [`GenomeId`](types::GenomeId), [`GeneId`](types::GeneId), [`Strand`](types::Strand):
//!   Identifiers
//! - [`TaxonCriteria`](types::TaxonCriteria): Taxon inclusion/exclusion filter
//! - [`HitError`](error::HitError): The resolution failure taxonomy
//!
//! ## Coordinates
//!
//! Coordinates are 0-based offsets into the concatenated coordinate space of a
//! genome, so every valid occurrence satisfies `0 <= coordinate < genome.size`.

pub mod error;
pub mod genome;
pub mod occurrence;
pub mod types;
