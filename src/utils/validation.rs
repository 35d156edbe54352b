//! Centralized validation and input limits.

/// Maximum number of sequences in a single genome entry (DOS protection)
pub const MAX_SEQUENCES_PER_GENOME: usize = 100_000;

/// Maximum number of encoded values accepted from one shard
pub const MAX_SHARD_VALUES: usize = 10_000_000;

/// Maximum number of records accepted from one alignment report
pub const MAX_ALIGNMENT_RECORDS: usize = 1_000_000;

/// Maximum decoded size of one shard file, in bytes
pub const MAX_SHARD_BYTES: u64 = 512 * 1024 * 1024;

/// Maximum decoded size of one alignment report, in bytes
pub const MAX_REPORT_BYTES: u64 = 256 * 1024 * 1024;

/// IUPAC nucleotide symbols accepted in a motif
const IUPAC_SYMBOLS: &[u8] = b"ACGTUNRYSWKMBDHV";

/// Security validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty motif provided")]
    EmptyMotif,
    #[error("Invalid symbol '{symbol}' in motif '{motif}'")]
    InvalidMotif { motif: String, symbol: char },
}

/// Check if adding another sequence to a genome would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES_PER_GENOME {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES_PER_GENOME}"
        ))
    } else {
        None
    }
}

/// Check a shard's value count against [`MAX_SHARD_VALUES`]
#[must_use]
pub fn check_shard_limit(count: usize) -> Option<String> {
    if count > MAX_SHARD_VALUES {
        Some(format!(
            "Too many encoded values: {count} exceeds maximum of {MAX_SHARD_VALUES}"
        ))
    } else {
        None
    }
}

/// Same contract as [`check_sequence_limit`], for alignment records
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_ALIGNMENT_RECORDS {
        Some(format!(
            "Too many alignment records: adding another would exceed maximum of \
             {MAX_ALIGNMENT_RECORDS}"
        ))
    } else {
        None
    }
}

/// Validate a motif and normalize it to upper case.
///
/// # Examples
///
/// ```
/// use crispr_hits::utils::validation::validate_motif;
///
/// assert_eq!(validate_motif(" acgtn ").unwrap(), "ACGTN");
/// assert!(validate_motif("ACGT-").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::EmptyMotif` for an empty or blank motif, or
/// `ValidationError::InvalidMotif` naming the first non-IUPAC symbol.
pub fn validate_motif(motif: &str) -> Result<String, ValidationError> {
    let trimmed = motif.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMotif);
    }

    let normalized = trimmed.to_ascii_uppercase();
    if let Some(symbol) = normalized
        .chars()
        .find(|c| !c.is_ascii() || !IUPAC_SYMBOLS.contains(&(*c as u8)))
    {
        return Err(ValidationError::InvalidMotif {
            motif: trimmed.to_string(),
            symbol,
        });
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sequence_limit() {
        assert!(check_sequence_limit(0).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES_PER_GENOME - 1).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES_PER_GENOME).is_some());
    }

    #[test]
    fn test_check_shard_limit() {
        assert!(check_shard_limit(MAX_SHARD_VALUES).is_none());
        assert!(check_shard_limit(MAX_SHARD_VALUES + 1).is_some());
    }

    #[test]
    fn test_check_record_limit() {
        assert!(check_record_limit(MAX_ALIGNMENT_RECORDS - 1).is_none());
        assert!(check_record_limit(MAX_ALIGNMENT_RECORDS).is_some());
    }

    #[test]
    fn test_validate_motif() {
        assert_eq!(
            validate_motif("GGCAtcgatcgatcgatcgaAGG").unwrap(),
            "GGCATCGATCGATCGATCGAAGG"
        );
        assert_eq!(validate_motif("   "), Err(ValidationError::EmptyMotif));
        assert_eq!(
            validate_motif("ACGZ"),
            Err(ValidationError::InvalidMotif {
                motif: "ACGZ".to_string(),
                symbol: 'Z'
            })
        );
        assert!(validate_motif("ACGé").is_err());
    }
}
