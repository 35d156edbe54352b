use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Side table holding coordinates too large for the standard layout.
///
/// Entries are keyed by compact genome index; within a genome, an extended
/// encoded value's coordinate field holds the slot of its true coordinate.
/// Each shard ships its own table alongside its encoded values.
///
/// Serialized as the entry map alone; the slot index is rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<u32, Vec<u64>>", into = "BTreeMap<u32, Vec<u64>>")]
pub struct LongTable {
    entries: BTreeMap<u32, Vec<u64>>,
    slots: HashMap<(u32, u64), u64>,
}

impl LongTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a coordinate for a genome and return its slot.
    /// A coordinate already present keeps its existing slot.
    pub fn insert(&mut self, genome_index: u32, coordinate: u64) -> u64 {
        if let Some(&slot) = self.slots.get(&(genome_index, coordinate)) {
            return slot;
        }
        let coordinates = self.entries.entry(genome_index).or_default();
        let slot = coordinates.len() as u64;
        coordinates.push(coordinate);
        self.slots.insert((genome_index, coordinate), slot);
        slot
    }

    /// Look up the true coordinate stored at a slot
    #[must_use]
    pub fn get(&self, genome_index: u32, slot: u64) -> Option<u64> {
        let slot = usize::try_from(slot).ok()?;
        self.entries.get(&genome_index)?.get(slot).copied()
    }

    /// Total number of entries across all genomes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

impl PartialEq for LongTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for LongTable {}

impl From<BTreeMap<u32, Vec<u64>>> for LongTable {
    fn from(entries: BTreeMap<u32, Vec<u64>>) -> Self {
        let mut slots = HashMap::new();
        for (&genome_index, coordinates) in &entries {
            for (slot, &coordinate) in coordinates.iter().enumerate() {
                slots.entry((genome_index, coordinate)).or_insert(slot as u64);
            }
        }
        Self { entries, slots }
    }
}

impl From<LongTable> for BTreeMap<u32, Vec<u64>> {
    fn from(table: LongTable) -> Self {
        table.entries
    }
}
