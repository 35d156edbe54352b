use thiserror::Error;

use crate::core::types::GenomeId;

/// Failures raised while resolving one motif query.
///
/// Every variant is recoverable at some level: per-occurrence and per-record
/// failures are logged and skipped, `NoBlastHit` means "no confirmed gene" and
/// `EmptySearch` is a normal empty answer. Only a `ConsistencyError` raised for
/// the whole query (every shard failed) stops a resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HitError {
    #[error("Corrupt occurrence encoding {value:#x}: {reason}")]
    CorruptEncoding { value: u64, reason: String },

    #[error("No long-table entry for genome index {genome_index} slot {slot} (value {value:#x})")]
    MissingLongEntry {
        value: u64,
        genome_index: u32,
        slot: u64,
    },

    #[error("Unknown genome: {0}")]
    UnknownGenome(GenomeId),

    #[error("No alignment hit for motif {motif}")]
    NoBlastHit { motif: String },

    #[error("No surviving hits for motif {motif} under the given filters")]
    EmptySearch { motif: String },

    #[error("Consistency error: {0}")]
    ConsistencyError(String),
}

impl HitError {
    /// Codec and index/data mismatches that callers surface as consistency warnings
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::CorruptEncoding { .. } | Self::MissingLongEntry { .. } | Self::ConsistencyError(_)
        )
    }

    /// Result-level outcomes that represent a normal empty answer
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::NoBlastHit { .. } | Self::EmptySearch { .. })
    }
}
