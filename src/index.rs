//! Date-indexed store of normalized records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::CountryDayRecord;

/// All records of one date, keyed by 3-letter country code.
pub type Bucket = BTreeMap<String, CountryDayRecord>;

/// Mapping from date to the country records reported on that date.
///
/// Built once per ingestion and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DateIndex {
    by_date: BTreeMap<NaiveDate, Bucket>,
}

impl DateIndex {
    /// Folds records into an index. Later records for the same date and country
    /// replace earlier ones.
    pub fn build(records: impl IntoIterator<Item = CountryDayRecord>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
        for record in records {
            by_date
                .entry(record.date)
                .or_default()
                .insert(record.iso_code.clone(), record);
        }
        Self { by_date }
    }

    pub fn bucket(&self, date: NaiveDate) -> Option<&Bucket> {
        self.by_date.get(&date)
    }

    pub fn get(&self, date: NaiveDate, iso_code: &str) -> Option<&CountryDayRecord> {
        self.by_date.get(&date)?.get(iso_code)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.by_date.keys().next_back().copied()
    }

    /// Number of date buckets.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Total records across all buckets.
    pub fn record_count(&self) -> usize {
        self.by_date.values().map(BTreeMap::len).sum()
    }

    /// Most recent record for `iso_code` on or before `date`.
    /// Up to `limit` dates with a bucket on or before `date`, newest first.
    pub fn dates_up_to(
        &self,
        date: NaiveDate,
        limit: usize,
    ) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.range(..=date).rev().take(limit).map(|(d, _)| *d)
    }

    pub fn latest_for(&self, iso_code: &str, date: NaiveDate) -> Option<&CountryDayRecord> {
        self.by_date
            .range(..=date)
            .rev()
            .find_map(|(_, bucket)| bucket.get(iso_code))
    }
}
