use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::catalog::genes::{GeneCatalog, GeneRef};
use crate::core::genome::GenomeRef;
use crate::core::types::{GeneId, GenomeId};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

/// Catalog version for compatibility checking
pub const CATALOG_VERSION: &str = "1.0.0";

/// Serializable catalog format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    pub version: String,
    pub created_at: String,
    pub genomes: Vec<GenomeRef>,
    #[serde(default)]
    pub genes: Vec<GeneRef>,
}

/// The genome catalog with its compact-index mapping.
///
/// The position of a genome in `genomes` is its compact index, the value the
/// occurrence codec stores in place of the full genome id. The catalog is
/// immutable once loaded and is shared between queries behind an `Arc`.
#[derive(Debug, Default)]
pub struct GenomeCatalog {
    /// All known genomes, in compact-index order
    pub genomes: Vec<GenomeRef>,

    /// Genes reported on these genomes
    pub genes: GeneCatalog,

    /// Index: genome ID -> compact index
    id_to_index: HashMap<GenomeId, u32>,
}

impl GenomeCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read, or the
    /// errors of [`GenomeCatalog::from_json`].
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse catalog from JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for malformed JSON and
    /// `CatalogError::Invalid` for duplicate ids, zero-size genomes, or genes
    /// on unknown genomes.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != CATALOG_VERSION {
            warn!(
                expected = CATALOG_VERSION,
                found = %data.version,
                "Catalog version mismatch"
            );
        }

        let mut catalog = Self::new();
        for mut genome in data.genomes {
            genome.normalize_size();
            catalog.add_genome(genome)?;
        }
        for gene in data.genes {
            catalog.add_gene(gene)?;
        }

        Ok(catalog)
    }

    /// Add a genome to the catalog, assigning it the next compact index
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the id is already present, the genome
    /// has zero size, or the compact index space is exhausted.
    pub fn add_genome(&mut self, genome: GenomeRef) -> Result<u32, CatalogError> {
        if genome.size == 0 {
            return Err(CatalogError::Invalid(format!(
                "Genome '{}' has zero size",
                genome.id
            )));
        }
        if self.id_to_index.contains_key(&genome.id) {
            return Err(CatalogError::Invalid(format!(
                "Duplicate genome id '{}'",
                genome.id
            )));
        }
        let index = u32::try_from(self.genomes.len())
            .map_err(|_| CatalogError::Invalid("Too many genomes".to_string()))?;

        self.id_to_index.insert(genome.id.clone(), index);
        self.genomes.push(genome);
        Ok(index)
    }

    /// Replace a genome in place, keeping its compact index. A genome with a
    /// new id is appended.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the genome has zero size.
    pub fn replace_genome(&mut self, genome: GenomeRef) -> Result<u32, CatalogError> {
        match self.id_to_index.get(&genome.id) {
            Some(&index) => {
                if genome.size == 0 {
                    return Err(CatalogError::Invalid(format!(
                        "Genome '{}' has zero size",
                        genome.id
                    )));
                }
                self.genomes[index as usize] = genome;
                Ok(index)
            }
            None => self.add_genome(genome),
        }
    }

    /// Add a gene to the catalog
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the gene's genome is unknown or the
    /// gene id is already present.
    pub fn add_gene(&mut self, gene: GeneRef) -> Result<(), CatalogError> {
        if !self.id_to_index.contains_key(&gene.genome_id) {
            return Err(CatalogError::Invalid(format!(
                "Gene '{}' references unknown genome '{}'",
                gene.id, gene.genome_id
            )));
        }
        let id = gene.id.clone();
        if !self.genes.insert(gene) {
            return Err(CatalogError::Invalid(format!("Duplicate gene id '{id}'")));
        }
        Ok(())
    }

    /// Get a genome by ID
    #[must_use]
    pub fn get(&self, id: &GenomeId) -> Option<&GenomeRef> {
        self.id_to_index
            .get(id)
            .map(|&idx| &self.genomes[idx as usize])
    }

    /// Get a genome by compact index
    #[must_use]
    pub fn get_by_index(&self, index: u32) -> Option<&GenomeRef> {
        self.genomes.get(index as usize)
    }

    /// Compact index of a genome
    #[must_use]
    pub fn index_of(&self, id: &GenomeId) -> Option<u32> {
        self.id_to_index.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &GenomeId) -> bool {
        self.id_to_index.contains_key(id)
    }

    #[must_use]
    pub fn genome_size(&self, id: &GenomeId) -> Option<u64> {
        self.get(id).map(|g| g.size)
    }

    #[must_use]
    pub fn taxon(&self, id: &GenomeId) -> Option<&str> {
        self.get(id).map(|g| g.taxon.as_str())
    }

    /// Organism of a gene: the gene entry's own organism, else its genome's
    #[must_use]
    pub fn organism(&self, gene_id: &GeneId) -> Option<&str> {
        let gene = self.genes.get(gene_id)?;
        gene.organism
            .as_deref()
            .or_else(|| self.get(&gene.genome_id).map(|g| g.organism.as_str()))
    }

    /// Genome a gene lies on
    #[must_use]
    pub fn genome_of(&self, gene_id: &GeneId) -> Option<&GenomeId> {
        self.genes.genome_of(gene_id)
    }

    /// Export catalog to JSON
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = CatalogData {
            version: CATALOG_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            genomes: self.genomes.clone(),
            genes: self.genes.iter().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Number of genomes in catalog
    #[must_use]
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Check if catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn make_test_catalog() -> GenomeCatalog {
    let mut catalog = GenomeCatalog::new();
    catalog
        .add_genome(GenomeRef::new("G1", "Taxon1", "Organism one", 1000))
        .unwrap();
    catalog
        .add_genome(GenomeRef::new("G2", "Taxon2", "Organism two", 5_000_000))
        .unwrap();
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"{
        "version": "1.0.0",
        "created_at": "2024-01-01T00:00:00Z",
        "genomes": [
            {"id": "G1", "taxon": "Buchnera aphidicola", "organism": "Buchnera aphidicola (Cinara tujafilina)", "size": 1000},
            {"id": "G2", "taxon": "Aliivibrio wodanis", "organism": "Aliivibrio wodanis",
             "sequences": [{"name": "chr1", "length": 4000000}, {"name": "chr2", "length": 1000000}]}
        ],
        "genes": [
            {"id": "geneA", "genome_id": "G1"},
            {"id": "geneB", "genome_id": "G2", "organism": "A. wodanis strain 06/09/139", "span": {"start": 10, "end": 40}}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let catalog = GenomeCatalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.genome_size(&GenomeId::new("G2")), Some(5_000_000));
        assert_eq!(catalog.index_of(&GenomeId::new("G2")), Some(1));
        assert_eq!(catalog.taxon(&GenomeId::new("G1")), Some("Buchnera aphidicola"));
    }

    #[test]
    fn test_gene_organism_falls_back_to_genome() {
        let catalog = GenomeCatalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(
            catalog.organism(&GeneId::new("geneA")),
            Some("Buchnera aphidicola (Cinara tujafilina)")
        );
        assert_eq!(
            catalog.organism(&GeneId::new("geneB")),
            Some("A. wodanis strain 06/09/139")
        );
        assert_eq!(
            catalog.genome_of(&GeneId::new("geneB")),
            Some(&GenomeId::new("G2"))
        );
    }

    #[test]
    fn test_duplicate_genome_rejected() {
        let mut catalog = make_test_catalog();
        let result = catalog.add_genome(GenomeRef::new("G1", "t", "o", 10));
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut catalog = GenomeCatalog::new();
        let result = catalog.add_genome(GenomeRef::new("G0", "t", "o", 0));
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_replace_genome_keeps_index() {
        let mut catalog = make_test_catalog();
        let index = catalog
            .replace_genome(GenomeRef::new("G1", "Taxon1b", "Organism one", 2000))
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(catalog.genome_size(&GenomeId::new("G1")), Some(2000));
        assert_eq!(catalog.len(), 2);

        let index = catalog
            .replace_genome(GenomeRef::new("G3", "Taxon3", "Organism three", 10))
            .unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_gene_on_unknown_genome_rejected() {
        let mut catalog = make_test_catalog();
        let result = catalog.add_gene(GeneRef::new("geneX", "G9"));
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_to_json_roundtrip() {
        let catalog = GenomeCatalog::from_json(CATALOG_JSON).unwrap();
        let json = catalog.to_json().unwrap();
        assert!(json.contains("\"version\""));

        let reloaded = GenomeCatalog::from_json(&json).unwrap();
        assert_eq!(reloaded.len(), catalog.len());
        assert_eq!(reloaded.genes.len(), 2);
    }

    #[test]
    fn test_get_by_index() {
        let catalog = make_test_catalog();
        assert_eq!(catalog.get_by_index(0).unwrap().id, GenomeId::new("G1"));
        assert!(catalog.get_by_index(7).is_none());
    }
}
