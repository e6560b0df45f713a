use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Anomaly;

/// Counters and recovered anomalies from one ingestion pass.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,

    pub data_lines: usize,
    pub records: usize,
    pub dates: usize,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,

    // skipped rows
    pub world_rows: usize,
    pub malformed_rows: usize,
    pub invalid_dates: usize,

    /// Rows whose code has no 2-letter mapping, counted per row.
    pub unknown_country_codes: usize,
    /// Occurrences per unmapped code.
    pub unknown_codes: BTreeMap<String, usize>,

    /// Row-level anomalies. An unmapped code is listed once, at its first line.
    pub anomalies: Vec<Anomaly>,
}

impl IngestReport {
    pub fn new() -> Self {
        IngestReport {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Counts `anomaly` and keeps it for later inspection.
    pub fn record(&mut self, anomaly: Anomaly) {
        match &anomaly {
            Anomaly::MalformedRow { .. } => self.malformed_rows += 1,
            Anomaly::InvalidDate { .. } => self.invalid_dates += 1,
            Anomaly::UnknownCountryCode { iso_code, .. } => {
                self.unknown_country_codes += 1;
                let seen = self.unknown_codes.entry(iso_code.clone()).or_default();
                *seen += 1;
                if *seen > 1 {
                    return;
                }
            }
            Anomaly::MissingSeriesPoint { .. } => {}
        }
        debug!(%anomaly, "Recovered anomaly");
        self.anomalies.push(anomaly);
    }

    /// Rows that did not make it into the index.
    pub fn skipped_rows(&self) -> usize {
        self.world_rows + self.malformed_rows + self.invalid_dates
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of data lines that were skipped, in percent.
    pub fn skipped_pct(&self) -> f64 {
        Self::pct(self.skipped_rows(), self.data_lines)
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(IngestReport::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(IngestReport::pct(50, 100), 50.0);
        assert_eq!(IngestReport::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_counts_by_kind() {
        let mut report = IngestReport::new();
        report.record(Anomaly::MalformedRow {
            line: 1,
            expected: 7,
            found: 2,
        });
        report.record(Anomaly::UnknownCountryCode {
            line: 2,
            iso_code: "OWID_EUR".to_string(),
        });
        report.world_rows = 2;
        report.data_lines = 8;

        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.unknown_country_codes, 1);
        assert_eq!(report.anomalies.len(), 2);
        assert_eq!(report.skipped_rows(), 3);
        assert_eq!(report.skipped_pct(), 37.5);
    }

    #[test]
    fn test_unknown_code_listed_once_but_counted_per_row() {
        let mut report = IngestReport::new();
        for line in 1..=1000 {
            report.record(Anomaly::UnknownCountryCode {
                line,
                iso_code: "OWID_EUR".to_string(),
            });
        }
        report.record(Anomaly::UnknownCountryCode {
            line: 1001,
            iso_code: "OWID_ASI".to_string(),
        });

        assert_eq!(report.unknown_country_codes, 1001);
        assert_eq!(report.unknown_codes["OWID_EUR"], 1000);
        assert_eq!(report.unknown_codes["OWID_ASI"], 1);
        assert_eq!(
            report.anomalies,
            vec![
                Anomaly::UnknownCountryCode {
                    line: 1,
                    iso_code: "OWID_EUR".to_string()
                },
                Anomaly::UnknownCountryCode {
                    line: 1001,
                    iso_code: "OWID_ASI".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_with_source() {
        let report = IngestReport::new().with_source("data.csv");
        assert_eq!(report.source.as_deref(), Some("data.csv"));
    }
}
