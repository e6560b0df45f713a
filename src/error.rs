//! Error and anomaly types for the ingestion pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Errors that end the current request.
///
/// A failed fetch or parse leaves any previously published index untouched.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport failure or non-success HTTP status while retrieving the CSV.
    #[error("could not load data from {url}: {message}")]
    Fetch { url: String, message: String },

    /// Failed to read a local CSV snapshot.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader itself gave up (e.g. invalid UTF-8).
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Input text has no header line.
    #[error("CSV input has no header row")]
    MissingHeader,

    /// Neither today's nor yesterday's bucket exists.
    #[error("no data available for {today} or {yesterday}")]
    NoDataAvailable { today: NaiveDate, yesterday: NaiveDate },

    #[error("unknown metric '{0}' (expected total_vaccinations or total_vaccinations_per_hundred)")]
    UnknownMetric(String),

    /// The country has no record on or before the requested day.
    #[error("no record for {iso_code} on or before {date}")]
    CountryNotFound { iso_code: String, date: NaiveDate },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A recoverable per-row or per-point problem.
///
/// Anomalies are recorded with the substitution already applied; they never
/// abort the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Data line with fewer fields than the header. The row was skipped.
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    /// Row whose `date` is not `YYYY-MM-DD`. The row was skipped.
    InvalidDate { line: u64, value: String },
    /// No 2-letter mapping for the country. The record has no flag URL.
    UnknownCountryCode { line: u64, iso_code: String },
    /// A ranked country has no record on a selected day. The point is `null`.
    MissingSeriesPoint { iso_code: String, date: NaiveDate },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::MalformedRow {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: expected {expected} fields, found {found}; row skipped"
            ),
            Anomaly::InvalidDate { line, value } => {
                write!(f, "line {line}: invalid date '{value}'; row skipped")
            }
            Anomaly::UnknownCountryCode { line, iso_code } => {
                write!(f, "line {line}: no 2-letter code for '{iso_code}'; flag omitted")
            }
            Anomaly::MissingSeriesPoint { iso_code, date } => {
                write!(f, "{iso_code} has no record on {date}; point left empty")
            }
        }
    }
}
