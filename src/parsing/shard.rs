//! Shard occurrence batches and their file readers.
//!
//! A shard batch is the encoded occurrence list one shard produced for a
//! motif, shipped with the shard's long table:
//!
//! ```json
//! {"shard_id": "shard-01", "values": [42, 29360128], "long_table": {"1": [4999999]}}
//! ```
//!
//! Files ending in `.json` are read as JSON, anything else as bincode. A
//! trailing `.gz` is decompressed first.

use bincode::Options;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::codec::{LongTable, OccurrenceCodec};
use crate::core::error::HitError;
use crate::core::occurrence::Occurrence;
use crate::parsing::blast::ParseError;
use crate::parsing::read_bounded;
use crate::utils::validation::{check_shard_limit, MAX_SHARD_BYTES};

/// Encoded occurrences from one shard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardBatch {
    pub shard_id: String,
    pub values: Vec<u64>,
    #[serde(default)]
    pub long_table: LongTable,
}

impl ShardBatch {
    pub fn new(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            values: Vec::new(),
            long_table: LongTable::new(),
        }
    }

    /// Encode occurrences into a new batch
    ///
    /// # Errors
    ///
    /// Returns the codec's encode errors.
    pub fn from_occurrences<'a, I>(
        shard_id: impl Into<String>,
        occurrences: I,
        codec: &OccurrenceCodec,
    ) -> Result<Self, HitError>
    where
        I: IntoIterator<Item = &'a Occurrence>,
    {
        let mut batch = Self::new(shard_id);
        for occurrence in occurrences {
            let value = codec.encode(occurrence, &mut batch.long_table)?;
            batch.values.push(value);
        }
        Ok(batch)
    }

    fn check_limits(&self) -> Result<(), ParseError> {
        if check_shard_limit(self.values.len()).is_some() {
            return Err(ParseError::TooManyValues(self.values.len()));
        }
        Ok(())
    }
}

/// A shard that can produce its encoded occurrences for a motif.
///
/// Fetching is blocking; the engine runs each fetch on the blocking pool under
/// a timeout.
pub trait ShardSource: Send + Sync {
    fn shard_id(&self) -> &str;

    /// # Errors
    ///
    /// Returns a `ParseError` if the shard's data cannot be read.
    fn fetch(&self, motif: &str) -> Result<ShardBatch, ParseError>;
}

impl ShardSource for ShardBatch {
    fn shard_id(&self) -> &str {
        &self.shard_id
    }

    fn fetch(&self, _motif: &str) -> Result<ShardBatch, ParseError> {
        Ok(self.clone())
    }
}

/// Shard batch stored in a file, one file per shard for the queried motif
#[derive(Debug, Clone)]
pub struct FileShardSource {
    shard_id: String,
    path: PathBuf,
}

impl FileShardSource {
    /// The shard id defaults to the file name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let shard_id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shard")
            .to_string();
        Self { shard_id, path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShardSource for FileShardSource {
    fn shard_id(&self) -> &str {
        &self.shard_id
    }

    fn fetch(&self, _motif: &str) -> Result<ShardBatch, ParseError> {
        let mut batch = read_shard_file(&self.path)?;
        if batch.shard_id.is_empty() {
            batch.shard_id.clone_from(&self.shard_id);
        }
        Ok(batch)
    }
}

fn is_gzip(name: &str) -> bool {
    name.ends_with(".gz")
}

fn is_json(name: &str) -> bool {
    name.strip_suffix(".gz").unwrap_or(name).ends_with(".json")
}

fn lowercase_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Read a shard batch file (bincode or JSON, optionally gzip-compressed)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Json` or
/// `ParseError::Bincode` if it cannot be decoded, `ParseError::TooLarge` if
/// the decompressed data exceeds the size limit, or
/// `ParseError::TooManyValues` if the value limit is exceeded.
pub fn read_shard_file(path: &Path) -> Result<ShardBatch, ParseError> {
    let name = lowercase_name(path);
    let file = std::fs::File::open(path)?;
    let reader: Box<dyn Read> = if is_gzip(&name) {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let batch = decode_batch(reader, is_json(&name), MAX_SHARD_BYTES)?;
    batch.check_limits()?;
    Ok(batch)
}

/// Same encoding as `bincode::serialize_into`, with a byte limit
fn bincode_options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
}

/// Decode a batch without reading more than `limit` bytes
fn decode_batch<R: Read>(reader: R, json: bool, limit: u64) -> Result<ShardBatch, ParseError> {
    if json {
        let bytes = read_bounded(reader, limit)?;
        return Ok(serde_json::from_slice(&bytes)?);
    }
    bincode_options(limit)
        .deserialize_from(reader)
        .map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => ParseError::TooLarge(limit),
            other => ParseError::Bincode(other.to_string()),
        })
}

/// Write a shard batch file, choosing the encoding from the file name
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be written, or
/// `ParseError::Json`/`ParseError::Bincode` if encoding fails.
pub fn write_shard_file(path: &Path, batch: &ShardBatch) -> Result<(), ParseError> {
    let name = lowercase_name(path);
    let writer = BufWriter::new(std::fs::File::create(path)?);

    if is_gzip(&name) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        write_batch(&mut encoder, batch, is_json(&name))?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        write_batch(&mut writer, batch, is_json(&name))?;
        writer.flush()?;
    }
    Ok(())
}

fn write_batch<W: Write>(writer: &mut W, batch: &ShardBatch, json: bool) -> Result<(), ParseError> {
    if json {
        serde_json::to_writer(writer, batch)?;
    } else {
        bincode::serialize_into(writer, batch).map_err(|e| ParseError::Bincode(e.to_string()))?;
    }
    Ok(())
}
