//! Header-keyed CSV parsing.
//!
//! Splits on commas with quoting disabled: fields containing embedded commas are
//! not supported. Blank lines are dropped and rows shorter than the header are
//! skipped and reported. Rows are yielded one at a time so callers can normalize
//! and drop each before the next is read.

use std::collections::HashMap;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::{Anomaly, PipelineError, Result};

/// Column names and their positions, resolved once per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvHeaders {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CsvHeaders {
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // First occurrence wins for repeated column names.
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

/// One data line keyed by header name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based data line index (the header is line 0). Blank lines count.
    pub index: u64,
    headers: Arc<CsvHeaders>,
    record: StringRecord,
}

impl RawRow {
    pub fn new(index: u64, headers: Arc<CsvHeaders>, record: StringRecord) -> Self {
        Self {
            index,
            headers,
            record,
        }
    }

    /// Returns the value under `name`, or `None` when the header has no such column.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .position(name)
            .and_then(|i| self.record.get(i))
    }
}

/// A data line as read: either a usable row or the reason it was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum CsvLine {
    Row(RawRow),
    Skipped(Anomaly),
}

/// Lazily reads data lines from CSV text.
pub struct CsvRows<'t> {
    bytes: &'t [u8],
    headers: Arc<CsvHeaders>,
    records: StringRecordsIntoIter<&'t [u8]>,
    scanned: usize,
    line: u64,
}

impl CsvRows<'_> {
    pub fn headers(&self) -> &Arc<CsvHeaders> {
        &self.headers
    }

    /// Physical 0-based line number of the byte at `offset`.
    fn line_at(&mut self, offset: usize) -> u64 {
        let offset = offset.min(self.bytes.len());
        if offset > self.scanned {
            self.line += self.bytes[self.scanned..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count() as u64;
            self.scanned = offset;
        }
        self.line
    }
}

impl Iterator for CsvRows<'_> {
    type Item = Result<CsvLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        // The header is line 0, so the physical line number is the data index.
        let offset = record.position().map_or(self.scanned, |p| p.byte() as usize);
        let index = self.line_at(offset);

        let expected = self.headers.len();
        if record.len() < expected {
            return Some(Ok(CsvLine::Skipped(Anomaly::MalformedRow {
                line: index,
                expected,
                found: record.len(),
            })));
        }

        Some(Ok(CsvLine::Row(RawRow::new(
            index,
            Arc::clone(&self.headers),
            record,
        ))))
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Reads the header line of `text` and returns an iterator over its data lines.
///
/// # Errors
///
/// Returns [`PipelineError::MissingHeader`] when the text has no header line, or
/// [`PipelineError::Csv`] when the reader fails outright.
pub fn read_rows(text: &str) -> Result<CsvRows<'_>> {
    let bytes = text.as_bytes();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(bytes);

    let names: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
    if names.iter().all(String::is_empty) {
        return Err(PipelineError::MissingHeader);
    }

    Ok(CsvRows {
        bytes,
        headers: Arc::new(CsvHeaders::new(names)),
        records: rdr.into_records(),
        scanned: 0,
        line: 0,
    })
}
