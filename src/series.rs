//! Per-country time series over the most recent days with data.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Anomaly;
use crate::index::DateIndex;
use crate::palette::{self, SERIES_CYCLE};
use crate::record::Metric;

pub const DEFAULT_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: NaiveDate,
    /// `None` when the country has no record on `x`.
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub series_id: String,
    pub color: &'static str,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    pub metric: Metric,
    /// Days covered by every series, ascending.
    pub days: Vec<NaiveDate>,
    pub requested_days: usize,
    pub series: Vec<Series>,
    pub missing: Vec<Anomaly>,
}

impl SeriesSet {
    /// `true` when the index had fewer data days than requested.
    pub fn is_short(&self) -> bool {
        self.days.len() < self.requested_days
    }
}

/// Returns up to `limit` dates that have a bucket on or before `today`,
/// ascending.
pub fn recent_days(index: &DateIndex, today: NaiveDate, limit: usize) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = index.dates_up_to(today, limit).collect();
    days.reverse();
    days
}

/// Builds one series per country in `iso_codes`, in input order.
///
/// A country with no record on one of the selected days gets a `None` point and a
/// [`Anomaly::MissingSeriesPoint`] entry; the series is still produced.
#[tracing::instrument(skip(index, iso_codes))]
pub fn build_series<S: AsRef<str>>(
    index: &DateIndex,
    metric: Metric,
    iso_codes: &[S],
    today: NaiveDate,
    limit: usize,
) -> SeriesSet {
    let days = recent_days(index, today, limit);
    let mut missing = Vec::new();

    let series = iso_codes
        .iter()
        .enumerate()
        .map(|(i, iso_code)| {
            let iso_code = iso_code.as_ref();
            let points = days
                .iter()
                .map(|&day| {
                    let y = index.get(day, iso_code).map(|r| metric.value(r));
                    if y.is_none() {
                        debug!(iso_code, %day, "Missing series point");
                        missing.push(Anomaly::MissingSeriesPoint {
                            iso_code: iso_code.to_string(),
                            date: day,
                        });
                    }
                    Point { x: day, y }
                })
                .collect();
            Series {
                series_id: iso_code.to_string(),
                color: palette::color(i, SERIES_CYCLE),
                points,
            }
        })
        .collect::<Vec<_>>();

    if days.len() < limit {
        info!(found = days.len(), requested = limit, "Fewer data days than requested");
    }

    SeriesSet {
        metric,
        days,
        requested_days: limit,
        series,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PALETTE;
    use crate::record::CountryDayRecord;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn rec(d: u32, iso: &str, total: u64) -> CountryDayRecord {
        CountryDayRecord {
            id: format!("{iso}-{d}"),
            date: day(d),
            iso_code: iso.to_string(),
            location: iso.to_string(),
            population: None,
            new_vaccinations: None,
            total_vaccinations: total,
            total_vaccinations_per_hundred: total as f64 / 10.0,
            flag_url: None,
        }
    }

    fn week() -> DateIndex {
        DateIndex::build((1..=7).flat_map(|d| {
            vec![rec(d, "TUR", d as u64 * 10), rec(d, "USA", d as u64 * 20)]
        }))
    }

    #[test]
    fn test_recent_days_ascending() {
        let index = week();
        assert_eq!(
            recent_days(&index, day(7), 5),
            vec![day(3), day(4), day(5), day(6), day(7)]
        );
    }

    #[test]
    fn test_recent_days_skips_gaps() {
        let index = DateIndex::build(vec![rec(1, "TUR", 1), rec(4, "TUR", 1), rec(6, "TUR", 1)]);
        assert_eq!(recent_days(&index, day(9), 2), vec![day(4), day(6)]);
    }

    #[test]
    fn test_recent_days_ignores_future_buckets() {
        let index = week();
        assert_eq!(recent_days(&index, day(2), 5), vec![day(1), day(2)]);
    }

    #[test]
    fn test_recent_days_far_past_the_data() {
        let index = week();
        let today = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert_eq!(recent_days(&index, today, 2), vec![day(6), day(7)]);
        assert_eq!(recent_days(&index, today, 0), Vec::<NaiveDate>::new());
    }

    #[test]
    fn test_recent_days_empty_index() {
        assert!(recent_days(&DateIndex::default(), day(1), 5).is_empty());
    }

    #[test]
    fn test_build_series_full_window() {
        let index = week();
        let set = build_series(&index, Metric::TotalVaccinations, &["USA", "TUR"], day(7), 5);

        assert!(!set.is_short());
        assert!(set.missing.is_empty());
        assert_eq!(set.series.len(), 2);
        assert_eq!(set.series[0].series_id, "USA");
        assert_eq!(set.series[0].color, PALETTE[0]);
        assert_eq!(set.series[1].color, PALETTE[1]);
        for s in &set.series {
            assert_eq!(s.points.len(), 5);
        }
        let usa: Vec<Option<f64>> = set.series[0].points.iter().map(|p| p.y).collect();
        assert_eq!(
            usa,
            vec![Some(60.0), Some(80.0), Some(100.0), Some(120.0), Some(140.0)]
        );
        assert_eq!(set.series[0].points[0].x, day(3));
    }

    #[test]
    fn test_build_series_shortfall_does_not_fail() {
        let index = DateIndex::build((1..=3).map(|d| rec(d, "TUR", d as u64)));
        let set = build_series(&index, Metric::TotalVaccinations, &["TUR"], day(3), 5);

        assert!(set.is_short());
        assert_eq!(set.days.len(), 3);
        assert_eq!(set.series[0].points.len(), 3);
    }

    #[test]
    fn test_build_series_missing_point_is_none() {
        let index = DateIndex::build(vec![
            rec(1, "TUR", 1),
            rec(1, "USA", 2),
            rec(2, "TUR", 3),
        ]);
        let set = build_series(&index, Metric::TotalVaccinations, &["USA"], day(2), 5);

        let points = &set.series[0].points;
        assert_eq!(points[0].y, Some(2.0));
        assert_eq!(points[1].y, None);
        assert_eq!(
            set.missing,
            vec![Anomaly::MissingSeriesPoint {
                iso_code: "USA".to_string(),
                date: day(2)
            }]
        );
    }

    #[test]
    fn test_series_colors_cycle_every_five() {
        let index = week();
        let codes: Vec<String> = (0..7).map(|i| format!("X{i}")).collect();
        let set = build_series(&index, Metric::TotalVaccinations, &codes, day(7), 1);
        assert_eq!(set.series[5].color, PALETTE[0]);
        assert_eq!(set.series[6].color, PALETTE[1]);
    }
}
