use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::catalog::genes::GeneSpan;
use crate::core::types::{GeneId, GenomeId};
use crate::parsing::read_bounded;
use crate::utils::validation::{check_record_limit, MAX_ALIGNMENT_RECORDS, MAX_REPORT_BYTES};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(String),

    #[error("Too many alignment records: {0} exceeds maximum allowed")]
    TooManyRecords(usize),

    #[error("Too many encoded values: {0} exceeds maximum allowed")]
    TooManyValues(usize),

    #[error("Input too large: more than {0} bytes")]
    TooLarge(u64),
}

/// Number of columns in BLAST `-outfmt 6` output
const TABULAR_COLUMNS: usize = 12;

/// One alignment of the motif against a gene of a subject genome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub subject_genome_id: GenomeId,
    pub gene_id: GeneId,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub mismatches: u32,
    pub evalue: f64,

    /// 0-based subject coordinates, `subject_start <= subject_end`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_end: Option<u64>,
}

impl AlignmentRecord {
    pub fn new(
        subject_genome_id: impl Into<String>,
        gene_id: impl Into<String>,
        percent_identity: f64,
        alignment_length: u64,
    ) -> Self {
        Self {
            subject_genome_id: GenomeId::new(subject_genome_id),
            gene_id: GeneId::new(gene_id),
            percent_identity,
            alignment_length,
            mismatches: 0,
            evalue: 0.0,
            subject_start: None,
            subject_end: None,
        }
    }

    #[must_use]
    pub fn with_mismatches(mut self, mismatches: u32) -> Self {
        self.mismatches = mismatches;
        self
    }

    #[must_use]
    pub fn with_evalue(mut self, evalue: f64) -> Self {
        self.evalue = evalue;
        self
    }

    /// Set the subject coordinates (0-based, either order)
    #[must_use]
    pub fn with_subject_range(mut self, a: u64, b: u64) -> Self {
        let span = GeneSpan::new(a, b);
        self.subject_start = Some(span.start);
        self.subject_end = Some(span.end);
        self
    }

    /// Subject span of the alignment, if the report carried coordinates
    #[must_use]
    pub fn span(&self) -> Option<GeneSpan> {
        match (self.subject_start, self.subject_end) {
            (Some(start), Some(end)) => Some(GeneSpan::new(start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportData {
    query: String,
    #[serde(default)]
    records: Vec<AlignmentRecord>,
}

/// All alignment records for one motif, grouped by subject genome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReportData", into = "ReportData")]
pub struct AlignmentReport {
    query: String,
    subjects: BTreeMap<GenomeId, Vec<AlignmentRecord>>,
}

impl From<ReportData> for AlignmentReport {
    fn from(data: ReportData) -> Self {
        let mut report = Self::new(data.query);
        for record in data.records {
            report.push(record);
        }
        report
    }
}

impl From<AlignmentReport> for ReportData {
    fn from(report: AlignmentReport) -> Self {
        Self {
            query: report.query,
            records: report.subjects.into_values().flatten().collect(),
        }
    }
}

impl AlignmentReport {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            subjects: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn push(&mut self, record: AlignmentRecord) {
        self.subjects
            .entry(record.subject_genome_id.clone())
            .or_default()
            .push(record);
    }

    /// All records, ascending subject id then report order
    pub fn records(&self) -> impl Iterator<Item = &AlignmentRecord> {
        self.subjects.values().flatten()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &GenomeId> {
        self.subjects.keys()
    }

    #[must_use]
    pub fn subject_records(&self, genome_id: &GenomeId) -> &[AlignmentRecord] {
        self.subjects.get(genome_id).map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.values().all(Vec::is_empty)
    }
}

impl FromIterator<AlignmentRecord> for AlignmentReport {
    fn from_iter<I: IntoIterator<Item = AlignmentRecord>>(iter: I) -> Self {
        let mut report = Self::default();
        for record in iter {
            report.push(record);
        }
        report
    }
}

/// Parse an alignment report file: JSON (`.json`) or BLAST tabular, optionally
/// gzip-compressed
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or the errors of the
/// format-specific parsers.
pub fn parse_report_file(path: &Path) -> Result<AlignmentReport, ParseError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let file = std::fs::File::open(path)?;
    let (content, stem) = if let Some(stem) = name.strip_suffix(".gz") {
        (read_report_text(GzDecoder::new(file), MAX_REPORT_BYTES)?, stem)
    } else {
        let reader = std::io::BufReader::new(file);
        (read_report_text(reader, MAX_REPORT_BYTES)?, name.as_str())
    };

    if stem.ends_with(".json") {
        parse_report_json(&content)
    } else {
        parse_tabular_text(&content)
    }
}

fn read_report_text<R: Read>(reader: R, limit: u64) -> Result<String, ParseError> {
    let bytes = read_bounded(reader, limit)?;
    String::from_utf8(bytes)
        .map_err(|e| ParseError::InvalidFormat(format!("report is not UTF-8: {e}")))
}

/// Parse a JSON report: `{"query": ..., "records": [...]}`
///
/// # Errors
///
/// Returns `ParseError::TooLarge` for input over the report size limit,
/// `ParseError::Json` for malformed JSON, or `ParseError::TooManyRecords` if
/// the record limit is exceeded.
pub fn parse_report_json(json: &str) -> Result<AlignmentReport, ParseError> {
    if json.len() as u64 > MAX_REPORT_BYTES {
        return Err(ParseError::TooLarge(MAX_REPORT_BYTES));
    }
    let report: AlignmentReport = serde_json::from_str(json)?;
    if report.len() > MAX_ALIGNMENT_RECORDS {
        return Err(ParseError::TooManyRecords(report.len()));
    }
    Ok(report)
}

/// Parse BLAST tabular output (`-outfmt 6`).
///
/// Columns: qseqid sseqid pident length mismatch gapopen qstart qend sstart
/// send evalue bitscore. The subject id is `genome_id|gene_id`; a subject
/// without a `|` is used as both.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for short lines or bad numeric fields,
/// or `ParseError::TooManyRecords` if the record limit is exceeded.
pub fn parse_tabular_text(text: &str) -> Result<AlignmentReport, ParseError> {
    let mut report = AlignmentReport::default();
    let mut count = 0usize;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Line numbers in errors are 1-based
        let line_num = i + 1;

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < TABULAR_COLUMNS {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has {} fields, expected {TABULAR_COLUMNS}",
                fields.len()
            )));
        }

        if check_record_limit(count).is_some() {
            return Err(ParseError::TooManyRecords(count + 1));
        }

        if report.query.is_empty() {
            report.query = fields[0].to_string();
        }

        let (genome_id, gene_id) = fields[1].split_once('|').unwrap_or((fields[1], fields[1]));
        if genome_id.is_empty() || gene_id.is_empty() {
            return Err(ParseError::InvalidFormat(format!(
                "Invalid subject id on line {line_num}: '{}'",
                fields[1]
            )));
        }

        let percent_identity: f64 = parse_field(fields[2], "pident", line_num)?;
        if !(0.0..=100.0).contains(&percent_identity) {
            return Err(ParseError::InvalidFormat(format!(
                "Percent identity out of range on line {line_num}: {percent_identity}"
            )));
        }
        let alignment_length: u64 = parse_field(fields[3], "length", line_num)?;
        let mismatches: u32 = parse_field(fields[4], "mismatch", line_num)?;
        let sstart: u64 = parse_field(fields[8], "sstart", line_num)?;
        let send: u64 = parse_field(fields[9], "send", line_num)?;
        let evalue: f64 = parse_field(fields[10], "evalue", line_num)?;

        if sstart == 0 || send == 0 {
            return Err(ParseError::InvalidFormat(format!(
                "Subject coordinates are 1-based, got 0 on line {line_num}"
            )));
        }

        let record = AlignmentRecord::new(genome_id, gene_id, percent_identity, alignment_length)
            .with_mismatches(mismatches)
            .with_evalue(evalue)
            .with_subject_range(sstart - 1, send - 1);

        report.push(record);
        count += 1;
    }

    Ok(report)
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    column: &str,
    line_num: usize,
) -> Result<T, ParseError> {
    value.parse().map_err(|_| {
        ParseError::InvalidFormat(format!(
            "Invalid {column} on line {line_num}: '{value}'"
        ))
    })
}
