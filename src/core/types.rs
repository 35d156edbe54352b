use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a genome in the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeId(pub String);

impl GenomeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a gene (a homologous region reported by the aligner)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneId(pub String);

impl GeneId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strand on which a motif occurrence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    /// Parse a strand from its single-character form
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "+" => Some(Self::Forward),
            "-" => Some(Self::Reverse),
            _ => None,
        }
    }

    /// Bit used by the occurrence codec
    #[must_use]
    pub fn as_bit(self) -> u64 {
        match self {
            Self::Forward => 0,
            Self::Reverse => 1,
        }
    }

    #[must_use]
    pub fn from_bit(bit: u64) -> Self {
        if bit & 1 == 0 {
            Self::Forward
        } else {
            Self::Reverse
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}

/// Taxon inclusion/exclusion criteria applied during aggregation.
///
/// An empty `include` set admits every taxon. Exclusion always wins over inclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonCriteria {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub include: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclude: BTreeSet<String>,
}

impl TaxonCriteria {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether a taxon passes the criteria
    #[must_use]
    pub fn admits(&self, taxon: &str) -> bool {
        if self.exclude.contains(taxon) {
            return false;
        }
        self.include.is_empty() || self.include.contains(taxon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_bits() {
        assert_eq!(Strand::from_bit(Strand::Forward.as_bit()), Strand::Forward);
        assert_eq!(Strand::from_bit(Strand::Reverse.as_bit()), Strand::Reverse);
        assert_eq!(Strand::parse("-"), Some(Strand::Reverse));
        assert_eq!(Strand::parse("x"), None);
    }

    #[test]
    fn test_taxon_criteria_empty_admits_all() {
        let criteria = TaxonCriteria::default();
        assert!(criteria.admits("Escherichia coli"));
    }

    #[test]
    fn test_taxon_criteria_exclusion_wins() {
        let criteria = TaxonCriteria::new(["E. coli", "B. subtilis"], ["E. coli"]);
        assert!(!criteria.admits("E. coli"));
        assert!(criteria.admits("B. subtilis"));
        assert!(!criteria.admits("S. aureus"));
    }
}
