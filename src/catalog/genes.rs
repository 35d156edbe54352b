use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::types::{GeneId, GenomeId};

/// Inclusive 0-based span of a gene on its genome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSpan {
    pub start: u64,
    pub end: u64,
}

impl GeneSpan {
    /// Build a span from two ends in either order
    #[must_use]
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    #[must_use]
    pub fn contains(&self, coordinate: u64) -> bool {
        self.start <= coordinate && coordinate <= self.end
    }

    /// Check whether a motif of `length` bases starting at `start` lies
    /// entirely inside the span
    #[must_use]
    pub fn covers(&self, start: u64, length: u64) -> bool {
        let last = start.saturating_add(length.saturating_sub(1));
        self.start <= start && last <= self.end
    }
}

/// A gene known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRef {
    pub id: GeneId,

    /// Genome the gene lies on
    pub genome_id: GenomeId,

    /// Organism name; falls back to the genome's organism when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,

    /// Location on the genome. Without a span the whole genome counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<GeneSpan>,
}

impl GeneRef {
    pub fn new(id: impl Into<String>, genome_id: impl Into<String>) -> Self {
        Self {
            id: GeneId::new(id),
            genome_id: GenomeId::new(genome_id),
            organism: None,
            span: None,
        }
    }

    #[must_use]
    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: GeneSpan) -> Self {
        self.span = Some(span);
        self
    }
}

/// Read-only lookup from gene id to its genome and organism
#[derive(Debug, Clone, Default)]
pub struct GeneCatalog {
    genes: Vec<GeneRef>,
    id_to_index: HashMap<GeneId, usize>,
}

impl GeneCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a gene. Returns false (and keeps the existing entry) if the id is taken.
    pub fn insert(&mut self, gene: GeneRef) -> bool {
        if self.id_to_index.contains_key(&gene.id) {
            return false;
        }
        self.id_to_index.insert(gene.id.clone(), self.genes.len());
        self.genes.push(gene);
        true
    }

    #[must_use]
    pub fn get(&self, id: &GeneId) -> Option<&GeneRef> {
        self.id_to_index.get(id).map(|&idx| &self.genes[idx])
    }

    /// Genome a gene lies on
    #[must_use]
    pub fn genome_of(&self, id: &GeneId) -> Option<&GenomeId> {
        self.get(id).map(|g| &g.genome_id)
    }

    /// Organism recorded for a gene, if the gene entry carries one
    #[must_use]
    pub fn organism(&self, id: &GeneId) -> Option<&str> {
        self.get(id).and_then(|g| g.organism.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneRef> {
        self.genes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl FromIterator<GeneRef> for GeneCatalog {
    fn from_iter<T: IntoIterator<Item = GeneRef>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for gene in iter {
            catalog.insert(gene);
        }
        catalog
    }
}
