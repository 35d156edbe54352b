use serde::{Deserialize, Serialize};

use crate::core::types::{GenomeId, Strand};

/// A single location of a motif in one genome
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub genome_id: GenomeId,
    pub coordinate: u64,
    pub strand: Strand,
}

impl Occurrence {
    pub fn new(genome_id: impl Into<String>, coordinate: u64, strand: Strand) -> Self {
        Self {
            genome_id: GenomeId::new(genome_id),
            coordinate,
            strand,
        }
    }

    /// Dedup key within one genome bucket
    #[must_use]
    pub fn site(&self) -> (u64, Strand) {
        (self.coordinate, self.strand)
    }
}

impl std::fmt::Display for Occurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}({})", self.genome_id, self.coordinate, self.strand)
    }
}
