use std::sync::Arc;
use tracing::warn;

use crate::catalog::store::GenomeCatalog;
use crate::codec::layout::{CodecLayout, PackedOccurrence};
use crate::codec::long_table::LongTable;
use crate::core::error::HitError;
use crate::core::genome::GenomeRef;
use crate::core::occurrence::Occurrence;

/// Occurrences decoded from one shard, plus the values that had to be dropped
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub occurrences: Vec<Occurrence>,
    pub errors: Vec<HitError>,
}

/// Encodes and decodes occurrences against a catalog's compact genome indexes
#[derive(Debug, Clone)]
pub struct OccurrenceCodec {
    layout: CodecLayout,
    catalog: Arc<GenomeCatalog>,
}

impl OccurrenceCodec {
    pub fn new(catalog: Arc<GenomeCatalog>, layout: CodecLayout) -> Self {
        Self { layout, catalog }
    }

    #[must_use]
    pub fn layout(&self) -> CodecLayout {
        self.layout
    }

    /// Encode an occurrence, choosing the extended class (and recording the
    /// coordinate in `long_table`) when the coordinate is at or above the
    /// layout threshold
    ///
    /// # Errors
    ///
    /// Returns `HitError::UnknownGenome` if the genome is not in the catalog, or
    /// `HitError::ConsistencyError` if the coordinate lies outside the genome or
    /// a field overflows the layout.
    pub fn encode(
        &self,
        occurrence: &Occurrence,
        long_table: &mut LongTable,
    ) -> Result<u64, HitError> {
        let index = self
            .catalog
            .index_of(&occurrence.genome_id)
            .ok_or_else(|| HitError::UnknownGenome(occurrence.genome_id.clone()))?;
        let genome = &self.catalog.genomes[index as usize];

        if !genome.contains(occurrence.coordinate) {
            return Err(HitError::ConsistencyError(format!(
                "Coordinate {} outside genome '{}' of size {}",
                occurrence.coordinate, genome.id, genome.size
            )));
        }

        let packed = if self.layout.needs_extended(occurrence.coordinate) {
            PackedOccurrence::Extended {
                genome_index: u64::from(index),
                slot: long_table.insert(index, occurrence.coordinate),
                strand: occurrence.strand,
            }
        } else {
            PackedOccurrence::Standard {
                genome_index: u64::from(index),
                coordinate: occurrence.coordinate,
                strand: occurrence.strand,
            }
        };

        self.layout
            .pack(packed)
            .map_err(|e| HitError::ConsistencyError(e.to_string()))
    }

    /// Decode a standard-class value
    ///
    /// # Errors
    ///
    /// Returns `HitError::CorruptEncoding` if the value carries the extended
    /// sentinel, its genome index has no catalog entry, or its coordinate lies
    /// outside the genome.
    pub fn decode(&self, value: u64) -> Result<Occurrence, HitError> {
        match self.layout.unpack(value) {
            PackedOccurrence::Standard {
                genome_index,
                coordinate,
                strand,
            } => {
                let (_, genome) = self.genome_for(value, genome_index)?;
                self.checked(value, genome, coordinate)?;
                Ok(Occurrence {
                    genome_id: genome.id.clone(),
                    coordinate,
                    strand,
                })
            }
            PackedOccurrence::Extended { .. } => Err(HitError::CorruptEncoding {
                value,
                reason: "extended value decoded without a long table".to_string(),
            }),
        }
    }

    /// Decode an extended-class value through the shard's long table
    ///
    /// # Errors
    ///
    /// Returns `HitError::MissingLongEntry` if the long table has no entry for
    /// the value's genome index and slot, or `HitError::CorruptEncoding` if the
    /// value lacks the sentinel, its genome index is unmapped, or the looked-up
    /// coordinate lies outside the genome.
    pub fn decode_longer(
        &self,
        value: u64,
        long_table: &LongTable,
    ) -> Result<Occurrence, HitError> {
        match self.layout.unpack(value) {
            PackedOccurrence::Extended {
                genome_index,
                slot,
                strand,
            } => {
                let (index, genome) = self.genome_for(value, genome_index)?;
                let coordinate =
                    long_table
                        .get(index, slot)
                        .ok_or(HitError::MissingLongEntry {
                            value,
                            genome_index: index,
                            slot,
                        })?;
                self.checked(value, genome, coordinate)?;
                Ok(Occurrence {
                    genome_id: genome.id.clone(),
                    coordinate,
                    strand,
                })
            }
            PackedOccurrence::Standard { .. } => Err(HitError::CorruptEncoding {
                value,
                reason: "standard value passed to the long-table decoder".to_string(),
            }),
        }
    }

    /// Decode a value of either class
    ///
    /// # Errors
    ///
    /// See [`OccurrenceCodec::decode`] and [`OccurrenceCodec::decode_longer`].
    pub fn decode_any(&self, value: u64, long_table: &LongTable) -> Result<Occurrence, HitError> {
        if self.layout.unpack(value).is_extended() {
            self.decode_longer(value, long_table)
        } else {
            self.decode(value)
        }
    }

    /// Decode every value of a shard, dropping (and logging) the ones that fail
    #[must_use]
    pub fn decode_batch(&self, values: &[u64], long_table: &LongTable) -> DecodedBatch {
        let mut batch = DecodedBatch {
            occurrences: Vec::with_capacity(values.len()),
            errors: Vec::new(),
        };

        for &value in values {
            match self.decode_any(value, long_table) {
                Ok(occurrence) => batch.occurrences.push(occurrence),
                Err(e) => {
                    warn!(value = %format!("{value:#x}"), error = %e, "Dropping occurrence");
                    batch.errors.push(e);
                }
            }
        }

        batch
    }

    fn genome_for(&self, value: u64, genome_index: u64) -> Result<(u32, &GenomeRef), HitError> {
        u32::try_from(genome_index)
            .ok()
            .and_then(|idx| self.catalog.get_by_index(idx).map(|g| (idx, g)))
            .ok_or_else(|| HitError::CorruptEncoding {
                value,
                reason: format!("compact genome index {genome_index} has no catalog entry"),
            })
    }

    fn checked(&self, value: u64, genome: &GenomeRef, coordinate: u64) -> Result<(), HitError> {
        if genome.contains(coordinate) {
            Ok(())
        } else {
            Err(HitError::CorruptEncoding {
                value,
                reason: format!(
                    "coordinate {coordinate} outside genome '{}' of size {}",
                    genome.id, genome.size
                ),
            })
        }
    }
}
