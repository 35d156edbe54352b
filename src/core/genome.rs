use serde::{Deserialize, Serialize};

use crate::core::types::GenomeId;

/// A FASTA sequence belonging to a genome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRef {
    /// Sequence name (first word of the FASTA header)
    pub name: String,

    /// Sequence length in bases
    pub length: u64,

    /// Full FASTA header line, without the leading '>'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl SequenceRef {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            header: None,
        }
    }
}

/// An indexed genome in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeRef {
    /// Unique identifier
    pub id: GenomeId,

    /// Taxon name used for inclusion/exclusion filtering
    pub taxon: String,

    /// Organism name shown in summaries
    pub organism: String,

    /// Coordinate-space upper bound. Derived from `sequences` when omitted.
    #[serde(default)]
    pub size: u64,

    /// FASTA sequences of this genome
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<SequenceRef>,
}

impl GenomeRef {
    pub fn new(
        id: impl Into<String>,
        taxon: impl Into<String>,
        organism: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: GenomeId::new(id),
            taxon: taxon.into(),
            organism: organism.into(),
            size,
            sequences: Vec::new(),
        }
    }

    /// Attach FASTA sequences; the genome size becomes their total length
    #[must_use]
    pub fn with_sequences(mut self, sequences: Vec<SequenceRef>) -> Self {
        self.size = sequences.iter().map(|s| s.length).sum();
        self.sequences = sequences;
        self
    }

    /// Fill in the size from the sequence list if it was not given explicitly
    pub fn normalize_size(&mut self) {
        if self.size == 0 {
            self.size = self.sequences.iter().map(|s| s.length).sum();
        }
    }

    /// Check if a coordinate lies inside this genome
    #[must_use]
    pub fn contains(&self, coordinate: u64) -> bool {
        coordinate < self.size
    }
}
