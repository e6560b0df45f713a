//! One-shot ingestion and the published dataset.
//!
//! Ingestion builds a complete [`DateIndex`] before anything sees it. The
//! [`DatasetStore`] swaps finished indexes in whole and drops results from a
//! fetch that was superseded by a newer one.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::Result;
use crate::fetch::{HttpClient, load_source};
use crate::index::DateIndex;
use crate::normalize::{Normalized, RecordNormalizer};
use crate::parser::{CsvLine, read_rows};
use crate::stats::IngestReport;

/// A freshly built index and what happened while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub index: DateIndex,
    pub report: IngestReport,
}

/// Parses, normalizes and indexes `text`.
///
/// # Errors
///
/// Fails only when the text cannot be read as CSV at all. Bad rows are skipped
/// and recorded in the report.
#[tracing::instrument(skip_all, fields(bytes = text.len()))]
pub fn ingest(text: &str, normalizer: &RecordNormalizer) -> Result<Ingestion> {
    let mut report = IngestReport::new();
    let mut records = Vec::new();

    for line in read_rows(text)? {
        report.data_lines += 1;
        let row = match line? {
            CsvLine::Row(row) => row,
            CsvLine::Skipped(anomaly) => {
                report.record(anomaly);
                continue;
            }
        };
        match normalizer.normalize(&row) {
            Normalized::Record { record, anomaly } => {
                if let Some(anomaly) = anomaly {
                    report.record(anomaly);
                }
                records.push(record);
            }
            Normalized::WorldAggregate => report.world_rows += 1,
            Normalized::Rejected(anomaly) => report.record(anomaly),
        }
    }

    let index = DateIndex::build(records);

    report.records = index.record_count();
    report.dates = index.len();
    report.first_date = index.first_date();
    report.last_date = index.last_date();
    report.countries = index
        .dates()
        .filter_map(|d| index.bucket(d))
        .flat_map(|bucket| bucket.keys())
        .collect::<BTreeSet<_>>()
        .len();

    info!(
        records = report.records,
        dates = report.dates,
        countries = report.countries,
        skipped = report.skipped_rows(),
        "Ingestion complete"
    );
    Ok(Ingestion { index, report })
}

/// Identifies one fetch request. Later tickets always compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
struct Published {
    ticket: u64,
    index: Arc<DateIndex>,
    report: Option<Arc<IngestReport>>,
}

/// Holds the currently published index.
///
/// Readers get an `Arc` snapshot and never see a partially built index.
#[derive(Debug, Default)]
pub struct DatasetStore {
    issued: AtomicU64,
    published: RwLock<Published>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request. Any result from an older ticket will be discarded
    /// once this one (or a newer one) has been published.
    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Publishes `ingestion` unless a newer request already published.
    /// Returns whether the index was swapped in.
    pub fn publish(&self, ticket: FetchTicket, ingestion: Ingestion) -> bool {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if ticket.0 <= published.ticket {
            warn!(
                ticket = ticket.0,
                published = published.ticket,
                "Discarding stale ingestion"
            );
            return false;
        }
        *published = Published {
            ticket: ticket.0,
            index: Arc::new(ingestion.index),
            report: Some(Arc::new(ingestion.report)),
        };
        true
    }

    /// Snapshot of the published index (empty until the first publish).
    pub fn current(&self) -> Arc<DateIndex> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .clone()
    }

    pub fn report(&self) -> Option<Arc<IngestReport>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .report
            .clone()
    }

    /// Loads `source`, ingests it and publishes the result.
    ///
    /// On error nothing is published and the previous index stays current.
    #[tracing::instrument(skip(self, client, normalizer))]
    pub async fn refresh<C: HttpClient>(
        &self,
        client: &C,
        source: &str,
        normalizer: &RecordNormalizer,
    ) -> Result<Arc<DateIndex>> {
        let ticket = self.begin();
        let text = load_source(client, source).await?;
        let mut ingestion = ingest(&text, normalizer)?;
        ingestion.report = ingestion.report.with_source(source);
        self.publish(ticket, ingestion);
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::FlagUrls;
    use crate::error::Anomaly;
    use crate::fetch::stub::StubClient;
    use chrono::NaiveDate;

    const CSV: &str = "date,iso_code,location,population,new_vaccinations,total_vaccinations,total_vaccinations_per_hundred
2021-01-01,TUR,Turkey,84339067,,,5.2
2021-01-01,USA,United States,331002647,100,2000,10.1
2021-01-01,OWID_WRL,World,7794798729,,5000,0.06
2021-01-02,TUR,Turkey
2021-01-02,OWID_EUR,Europe,748506000,,3000,0.4
";

    fn normalizer() -> RecordNormalizer {
        RecordNormalizer::new(FlagUrls::new("{iso2}"))
    }

    #[test]
    fn test_ingest_builds_index_and_report() {
        let ingestion = ingest(CSV, &normalizer()).unwrap();
        let index = &ingestion.index;
        let report = &ingestion.report;

        let jan1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(index.bucket(jan1).unwrap().len(), 2);
        assert!(index.get(jan1, "OWID_WRL").is_none());
        assert_eq!(index.get(jan1, "TUR").unwrap().total_vaccinations, 0);

        assert_eq!(report.data_lines, 5);
        assert_eq!(report.records, 3);
        assert_eq!(report.world_rows, 1);
        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.unknown_country_codes, 1);
        assert_eq!(report.countries, 3);
        assert_eq!(report.dates, 2);
        assert!(report.anomalies.contains(&Anomaly::MalformedRow {
            line: 4,
            expected: 7,
            found: 3
        }));
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let first = ingest(CSV, &normalizer()).unwrap();
        let second = ingest(CSV, &normalizer()).unwrap();
        assert_eq!(first.index, second.index);
    }

    #[test]
    fn test_store_discards_stale_publish() {
        let store = DatasetStore::new();
        let older = store.begin();
        let newer = store.begin();

        let fresh = ingest(CSV, &normalizer()).unwrap();
        assert!(store.publish(newer, fresh.clone()));

        let stale = Ingestion {
            index: DateIndex::default(),
            report: IngestReport::new(),
        };
        assert!(!store.publish(older, stale));
        assert_eq!(*store.current(), fresh.index);
    }

    #[test]
    fn test_store_starts_empty() {
        let store = DatasetStore::new();
        assert!(store.current().is_empty());
        assert!(store.report().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_index() {
        let store = DatasetStore::new();
        let ticket = store.begin();
        let fresh = ingest(CSV, &normalizer()).unwrap();
        store.publish(ticket, fresh.clone());

        let client = crate::fetch::BasicClient::new();
        let missing = format!("{}/vaxboard_no_such_file.csv", std::env::temp_dir().display());
        assert!(store.refresh(&client, &missing, &normalizer()).await.is_err());
        assert_eq!(*store.current(), fresh.index);
    }

    #[tokio::test]
    async fn test_http_error_keeps_previous_index() {
        let store = DatasetStore::new();
        let ok = StubClient::ok(CSV);
        let first = store
            .refresh(&ok, "https://data.test/v.csv", &normalizer())
            .await
            .unwrap();
        assert_eq!(first.record_count(), 3);

        let failing = StubClient::with_status(503);
        let err = store
            .refresh(&failing, "https://data.test/v.csv", &normalizer())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Fetch { .. }));
        assert_eq!(*store.current(), *first);
        assert_eq!(
            store.report().unwrap().source.as_deref(),
            Some("https://data.test/v.csv")
        );
    }
}
