use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Strand;

/// Default width of the coordinate field (T = 2^22 = 4,194,304)
pub const DEFAULT_COORDINATE_BITS: u8 = 22;

/// Widest coordinate field allowed; leaves at least 14 bits for the genome index
pub const MAX_COORDINATE_BITS: u8 = 48;

/// Bits taken by the strand flag and the extended sentinel
const FLAG_BITS: u8 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Coordinate width must be between 1 and {MAX_COORDINATE_BITS} bits, got {0}")]
    InvalidWidth(u8),

    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u8,
    },
}

/// Field contents of one encoded occurrence.
///
/// `Standard` carries the coordinate itself. `Extended` is selected by the
/// sentinel bit and carries a slot into the shard's long table instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedOccurrence {
    Standard {
        genome_index: u64,
        coordinate: u64,
        strand: Strand,
    },
    Extended {
        genome_index: u64,
        slot: u64,
        strand: Strand,
    },
}

impl PackedOccurrence {
    #[must_use]
    pub fn genome_index(&self) -> u64 {
        match *self {
            Self::Standard { genome_index, .. } | Self::Extended { genome_index, .. } => {
                genome_index
            }
        }
    }

    #[must_use]
    pub fn strand(&self) -> Strand {
        match *self {
            Self::Standard { strand, .. } | Self::Extended { strand, .. } => strand,
        }
    }

    #[must_use]
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended { .. })
    }
}

/// Bit layout of an encoded occurrence, low to high:
///
/// | field | width |
/// |-------|-------|
/// | coordinate (or long-table slot) | `coordinate_bits` |
/// | strand | 1 |
/// | extended sentinel | 1 |
/// | compact genome index | `62 - coordinate_bits` |
///
/// Coordinates below the threshold `T = 2^coordinate_bits` use the standard
/// class; anything at or above `T` goes through the long table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CodecLayout {
    coordinate_bits: u8,
}

impl CodecLayout {
    /// Create a layout with the given coordinate width
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::InvalidWidth` if the width is 0 or above
    /// [`MAX_COORDINATE_BITS`].
    pub fn new(coordinate_bits: u8) -> Result<Self, LayoutError> {
        if coordinate_bits == 0 || coordinate_bits > MAX_COORDINATE_BITS {
            return Err(LayoutError::InvalidWidth(coordinate_bits));
        }
        Ok(Self { coordinate_bits })
    }

    #[must_use]
    pub fn coordinate_bits(&self) -> u8 {
        self.coordinate_bits
    }

    /// Width of the compact genome index field
    #[must_use]
    pub fn genome_bits(&self) -> u8 {
        64 - FLAG_BITS - self.coordinate_bits
    }

    /// Smallest coordinate that needs the extended class
    #[must_use]
    pub fn threshold(&self) -> u64 {
        1u64 << self.coordinate_bits
    }

    fn coordinate_mask(&self) -> u64 {
        self.threshold() - 1
    }

    fn strand_shift(&self) -> u8 {
        self.coordinate_bits
    }

    fn sentinel_shift(&self) -> u8 {
        self.coordinate_bits + 1
    }

    fn genome_shift(&self) -> u8 {
        self.coordinate_bits + FLAG_BITS
    }

    /// Largest compact genome index this layout can carry
    #[must_use]
    pub fn max_genome_index(&self) -> u64 {
        (1u64 << self.genome_bits()) - 1
    }

    /// Check whether a coordinate needs the extended class
    #[must_use]
    pub fn needs_extended(&self, coordinate: u64) -> bool {
        coordinate >= self.threshold()
    }

    /// Pack fields into an encoded value
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::FieldOverflow` if the genome index, coordinate, or
    /// slot does not fit its field.
    pub fn pack(&self, packed: PackedOccurrence) -> Result<u64, LayoutError> {
        let genome_index = packed.genome_index();
        if genome_index > self.max_genome_index() {
            return Err(LayoutError::FieldOverflow {
                field: "genome index",
                value: genome_index,
                bits: self.genome_bits(),
            });
        }

        let (field, low, sentinel) = match packed {
            PackedOccurrence::Standard { coordinate, .. } => ("coordinate", coordinate, 0),
            PackedOccurrence::Extended { slot, .. } => ("slot", slot, 1),
        };

        if low > self.coordinate_mask() {
            return Err(LayoutError::FieldOverflow {
                field,
                value: low,
                bits: self.coordinate_bits,
            });
        }

        Ok(low
            | (packed.strand().as_bit() << self.strand_shift())
            | (sentinel << self.sentinel_shift())
            | (genome_index << self.genome_shift()))
    }

    /// Split an encoded value into its fields. Every `u64` unpacks; whether the
    /// genome index and coordinate are meaningful is for the codec to check.
    #[must_use]
    pub fn unpack(&self, value: u64) -> PackedOccurrence {
        let low = value & self.coordinate_mask();
        let strand = Strand::from_bit(value >> self.strand_shift());
        let extended = (value >> self.sentinel_shift()) & 1 == 1;
        let genome_index = value >> self.genome_shift();

        if extended {
            PackedOccurrence::Extended {
                genome_index,
                slot: low,
                strand,
            }
        } else {
            PackedOccurrence::Standard {
                genome_index,
                coordinate: low,
                strand,
            }
        }
    }
}

impl Default for CodecLayout {
    fn default() -> Self {
        Self {
            coordinate_bits: DEFAULT_COORDINATE_BITS,
        }
    }
}

impl TryFrom<u8> for CodecLayout {
    type Error = LayoutError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<CodecLayout> for u8 {
    fn from(layout: CodecLayout) -> Self {
        layout.coordinate_bits
    }
}
