//! Top-N ranking of countries on the most recent day with data.

use std::cmp::Ordering;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::index::{Bucket, DateIndex};
use crate::palette::{self, LEADERBOARD_CYCLE};
use crate::record::{CountryDayRecord, Metric};

pub const DEFAULT_LIMIT: usize = 10;

/// A ranked view over a record in the index. The record itself is not modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<'a> {
    /// 1-based position.
    pub rank: usize,
    pub color: &'static str,
    pub record: &'a CountryDayRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard<'a> {
    /// The day the ranking was taken from.
    pub date: NaiveDate,
    pub metric: Metric,
    pub entries: Vec<RankedEntry<'a>>,
}

impl Leaderboard<'_> {
    /// Country codes in rank order.
    pub fn iso_codes(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.record.iso_code.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns today's bucket, falling back to yesterday's.
///
/// # Errors
///
/// [`PipelineError::NoDataAvailable`] when neither day has a bucket.
pub fn latest_bucket(index: &DateIndex, today: NaiveDate) -> Result<(NaiveDate, &Bucket)> {
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    for date in [today, yesterday] {
        if let Some(bucket) = index.bucket(date) {
            return Ok((date, bucket));
        }
        debug!(%date, "No bucket for date");
    }
    Err(PipelineError::NoDataAvailable { today, yesterday })
}

/// Descending by value; NaN sorts after every number.
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Ranks the countries of the latest bucket by `metric`, highest first, keeping
/// at most `limit` entries.
///
/// Ties keep ascending country-code order.
#[tracing::instrument(skip(index))]
pub fn rank(
    index: &DateIndex,
    metric: Metric,
    today: NaiveDate,
    limit: usize,
) -> Result<Leaderboard<'_>> {
    let (date, bucket) = latest_bucket(index, today)?;

    let mut records: Vec<&CountryDayRecord> = bucket.values().collect();
    records.sort_by(|a, b| descending(metric.value(a), metric.value(b)));
    records.truncate(limit);

    let entries = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedEntry {
            rank: i + 1,
            color: palette::color(i, LEADERBOARD_CYCLE),
            record,
        })
        .collect::<Vec<_>>();

    info!(%date, entries = entries.len(), "Leaderboard ranked");
    Ok(Leaderboard {
        date,
        metric,
        entries,
    })
}
