//! Genome builder for creating catalog entries from FASTA files and indexes.
//!
//! The `GenomeBuilder` collects the sequences of one genome from a FASTA index
//! (`.fai`) or a FASTA file (optionally gzip-compressed) and produces a
//! [`GenomeRef`] whose size is the total sequence length.

use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::core::genome::{GenomeRef, SequenceRef};
use crate::utils::validation::check_sequence_limit;

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Input format for auto-detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Fai,
    Fasta,
}

impl InputFormat {
    /// Detect format from file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();

        if name.ends_with(".fai") {
            return Some(Self::Fai);
        }

        let fasta_suffixes = [".fa", ".fasta", ".fna"];
        let stripped = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".bgz"))
            .unwrap_or(&name);
        if fasta_suffixes.iter().any(|s| stripped.ends_with(s)) {
            return Some(Self::Fasta);
        }

        None
    }
}

/// Builds a single [`GenomeRef`] from one or more sequence sources
#[derive(Debug)]
pub struct GenomeBuilder {
    id: String,
    taxon: Option<String>,
    organism: Option<String>,
    sequences: Vec<SequenceRef>,
    seen_names: HashSet<String>,
}

impl GenomeBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            taxon: None,
            organism: None,
            sequences: Vec::new(),
            seen_names: HashSet::new(),
        }
    }

    #[must_use]
    pub fn taxon(mut self, taxon: impl Into<String>) -> Self {
        self.taxon = Some(taxon.into());
        self
    }

    #[must_use]
    pub fn organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    /// Add a sequence
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Conflict` if a sequence with the same name was
    /// already added, or `BuilderError::Parse` if the sequence limit is exceeded.
    pub fn add_sequence(&mut self, sequence: SequenceRef) -> Result<(), BuilderError> {
        if let Some(msg) = check_sequence_limit(self.sequences.len()) {
            return Err(BuilderError::Parse(msg));
        }
        if !self.seen_names.insert(sequence.name.clone()) {
            return Err(BuilderError::Conflict(format!(
                "Sequence '{}' appears more than once in genome '{}'",
                sequence.name, self.id
            )));
        }
        self.sequences.push(sequence);
        Ok(())
    }

    /// Add all sequences from a file, detecting the format from its name
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Parse` for unrecognised formats, plus the errors of
    /// the format-specific readers.
    pub fn add_input(&mut self, path: &Path) -> Result<(), BuilderError> {
        match InputFormat::from_path(path) {
            Some(InputFormat::Fai) => self.add_fai_file(path),
            Some(InputFormat::Fasta) => self.add_fasta_file(path),
            None => Err(BuilderError::Parse(format!(
                "Unrecognised genome input format: {}",
                path.display()
            ))),
        }
    }

    /// Add sequences from a FASTA index (.fai) file using noodles
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Io` if the file cannot be read or
    /// `BuilderError::Parse` if it is not a valid index.
    pub fn add_fai_file(&mut self, path: &Path) -> Result<(), BuilderError> {
        use noodles::fasta;

        let reader = std::fs::File::open(path).map(BufReader::new)?;
        let index = fasta::fai::io::Reader::new(reader)
            .read_index()
            .map_err(|e| BuilderError::Parse(format!("Failed to parse FAI file: {e}")))?;

        for record in index.as_ref() {
            let name = String::from_utf8_lossy(record.name()).to_string();
            self.add_sequence(SequenceRef::new(name, record.length()))?;
        }
        Ok(())
    }

    /// Add sequences from FASTA index text (`name\tlength\t...` per line)
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Parse` on lines with a missing or invalid length.
    #[cfg(test)]
    fn add_fai_text(&mut self, text: &str) -> Result<(), BuilderError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(BuilderError::Parse(format!(
                    "FAI line has fewer than 2 fields: '{line}'"
                )));
            }
            let length: u64 = fields[1].parse().map_err(|_| {
                BuilderError::Parse(format!(
                    "Invalid length for sequence '{}': {}",
                    fields[0], fields[1]
                ))
            })?;
            self.add_sequence(SequenceRef::new(fields[0], length))?;
        }
        Ok(())
    }

    /// Add sequences (with their full headers) from a FASTA file, gzip-aware
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::Io` if the file cannot be read or
    /// `BuilderError::Parse` if a record is malformed.
    pub fn add_fasta_file(&mut self, path: &Path) -> Result<(), BuilderError> {
        let file = std::fs::File::open(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if name.ends_with(".gz") || name.ends_with(".bgz") {
            self.add_fasta_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            self.add_fasta_reader(BufReader::new(file))
        }
    }

    fn add_fasta_reader<R: BufRead>(&mut self, reader: R) -> Result<(), BuilderError> {
        use noodles::fasta;

        let mut fasta_reader = fasta::io::Reader::new(reader);
        for result in fasta_reader.records() {
            let record = result
                .map_err(|e| BuilderError::Parse(format!("Failed to parse FASTA record: {e}")))?;

            let name = String::from_utf8_lossy(record.name()).to_string();
            let header = match record.description() {
                Some(description) => {
                    format!("{name} {}", String::from_utf8_lossy(description))
                }
                None => name.clone(),
            };
            let length = record.sequence().len() as u64;

            let mut sequence = SequenceRef::new(name, length);
            sequence.header = Some(header);
            self.add_sequence(sequence)?;
        }
        Ok(())
    }

    /// Build the genome entry
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingField` if taxon or sequences are missing.
    pub fn build(self) -> Result<GenomeRef, BuilderError> {
        let taxon = self
            .taxon
            .ok_or_else(|| BuilderError::MissingField("taxon".to_string()))?;
        if self.sequences.is_empty() {
            return Err(BuilderError::MissingField("sequences".to_string()));
        }
        let organism = self.organism.unwrap_or_else(|| taxon.clone());

        Ok(GenomeRef::new(self.id, taxon, organism, 0).with_sequences(self.sequences))
    }
}
