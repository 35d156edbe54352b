//! Readers for the data the resolver consumes.
//!
//! - **Alignment reports**: BLAST tabular output (`-outfmt 6`) or JSON
//! - **Shard batches**: encoded occurrences plus long table, bincode or JSON
//!
//! Both readers accept gzip-compressed files (`.gz`).
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_hits::parsing::blast::parse_report_file;
//! use crispr_hits::parsing::shard::read_shard_file;
//! use std::path::Path;
//!
//! let report = parse_report_file(Path::new("sgRNA_1.blast.tsv")).unwrap();
//! let batch = read_shard_file(Path::new("shard-01.bin.gz")).unwrap();
//! ```

pub mod blast;
pub mod shard;

use std::io::Read;

use crate::parsing::blast::ParseError;

/// Read a whole input, failing once it holds more than `limit` bytes
pub(crate) fn read_bounded<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>, ParseError> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(ParseError::TooLarge(limit));
    }
    Ok(bytes)
}
