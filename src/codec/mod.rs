//! Packed 64-bit motif occurrences.
//!
//! An occurrence `(genome, coordinate, strand)` is stored as a single `u64`
//! holding the genome's compact catalog index, the strand, and either the
//! coordinate itself or, for coordinates at or above the layout threshold, a
//! slot into the shard's [`LongTable`].

pub mod decoder;
pub mod layout;
pub mod long_table;

pub use decoder::{DecodedBatch, OccurrenceCodec};
pub use layout::{CodecLayout, LayoutError, PackedOccurrence};
pub use long_table::LongTable;
