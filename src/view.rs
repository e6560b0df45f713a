//! Dashboard state owned by the presentation layer.
//!
//! Holds the published index, the selected metric and the derived outputs.
//! Switching the metric recomputes the ranking and the chart series from the
//! same index.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::index::DateIndex;
use crate::leaderboard::{self, Leaderboard};
use crate::record::{CountryDayRecord, Field, Metric};
use crate::series::{self, SeriesSet};

/// Label/value pairs shown when a country is selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailCard {
    pub iso_code: String,
    pub location: String,
    pub date: NaiveDate,
    pub flag_url: Option<String>,
    pub rows: Vec<(&'static str, String)>,
}

impl DetailCard {
    pub fn from_record(record: &CountryDayRecord) -> Self {
        let rows = [
            Field::Population,
            Field::TotalVaccinations,
            Field::TotalVaccinationsPerHundred,
        ]
        .into_iter()
        .map(|field| (field.label(), field.format(record)))
        .collect();

        Self {
            iso_code: record.iso_code.clone(),
            location: record.location.clone(),
            date: record.date,
            flag_url: record.flag_url.clone(),
            rows,
        }
    }

    /// Card for `iso_code` on its most recent day up to `date`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::CountryNotFound`] when the code is unknown or has no
    /// record on or before `date`.
    pub fn lookup(index: &DateIndex, iso_code: &str, date: NaiveDate) -> Result<Self> {
        index
            .latest_for(iso_code, date)
            .map(Self::from_record)
            .ok_or_else(|| PipelineError::CountryNotFound {
                iso_code: iso_code.to_string(),
                date,
            })
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    index: Arc<DateIndex>,
    today: NaiveDate,
    leaderboard_limit: usize,
    series_days: usize,
    metric: Metric,
    ranked: Vec<String>,
    series: SeriesSet,
}

impl DashboardView {
    /// Builds the view for `metric`.
    ///
    /// # Errors
    ///
    /// [`crate::error::PipelineError::NoDataAvailable`] when the index has no
    /// bucket for `today` or the day before.
    pub fn new(
        index: Arc<DateIndex>,
        metric: Metric,
        today: NaiveDate,
        leaderboard_limit: usize,
        series_days: usize,
    ) -> Result<Self> {
        let (ranked, series) = derive(&index, metric, today, leaderboard_limit, series_days)?;
        Ok(Self {
            index,
            today,
            leaderboard_limit,
            series_days,
            metric,
            ranked,
            series,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn is_active(&self, metric: Metric) -> bool {
        self.metric == metric
    }

    pub fn index(&self) -> &DateIndex {
        &self.index
    }

    /// Switches to `metric` and recomputes. On error the view keeps its previous state.
    pub fn select_metric(&mut self, metric: Metric) -> Result<()> {
        if metric == self.metric {
            return Ok(());
        }
        let (ranked, series) = derive(
            &self.index,
            metric,
            self.today,
            self.leaderboard_limit,
            self.series_days,
        )?;
        info!(from = %self.metric, to = %metric, "Metric switched");
        self.metric = metric;
        self.ranked = ranked;
        self.series = series;
        Ok(())
    }

    /// Current ranking. Borrowed from the index, so computed on demand.
    pub fn leaderboard(&self) -> Result<Leaderboard<'_>> {
        leaderboard::rank(&self.index, self.metric, self.today, self.leaderboard_limit)
    }

    /// Country codes of the current ranking, in rank order.
    pub fn ranked_iso_codes(&self) -> &[String] {
        &self.ranked
    }

    pub fn series(&self) -> &SeriesSet {
        &self.series
    }

    /// Detail card for `iso_code` on its most recent day up to `today`.
    pub fn detail(&self, iso_code: &str) -> Option<DetailCard> {
        self.index
            .latest_for(iso_code, self.today)
            .map(DetailCard::from_record)
    }
}

fn derive(
    index: &DateIndex,
    metric: Metric,
    today: NaiveDate,
    leaderboard_limit: usize,
    series_days: usize,
) -> Result<(Vec<String>, SeriesSet)> {
    let ranked = leaderboard::rank(index, metric, today, leaderboard_limit)?.iso_codes();
    let series = series::build_series(index, metric, &ranked, today, series_days);
    Ok((ranked, series))
}
