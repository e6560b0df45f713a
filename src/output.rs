//! Rendering and persistence of pipeline outputs.
//!
//! Supports plain-text tables, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::leaderboard::Leaderboard;
use crate::series::SeriesSet;
use crate::stats::IngestReport;
use crate::view::DetailCard;
use csv::WriterBuilder;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;

/// Flat CSV row for one ranked country.
#[derive(Debug, Serialize)]
struct LeaderboardRow<'a> {
    date: NaiveDate,
    metric: &'static str,
    rank: usize,
    iso_code: &'a str,
    location: &'a str,
    value: String,
    color: &'static str,
    flag_url: Option<&'a str>,
}

/// Renders the ranking as an aligned text table.
pub fn render_leaderboard(board: &Leaderboard<'_>) -> String {
    let field = board.metric.field();
    let mut out = format!("{} on {}\n", board.metric.label(), board.date);
    for entry in &board.entries {
        let _ = writeln!(
            out,
            "{:>3}. {:<4} {:<32} {:>16}  {}",
            entry.rank,
            entry.record.iso_code,
            entry.record.location,
            field.format(entry.record),
            entry.color
        );
    }
    out
}

/// Renders one line per series: code, color, then `date=value` pairs.
pub fn render_series(set: &SeriesSet) -> String {
    let mut out = format!("{} over {} day(s)", set.metric.label(), set.days.len());
    if set.is_short() {
        let _ = write!(out, " (requested {})", set.requested_days);
    }
    out.push('\n');
    for series in &set.series {
        let _ = write!(out, "{:<4} {}", series.series_id, series.color);
        for point in &series.points {
            match point.y {
                Some(y) => {
                    let _ = write!(out, "  {}={}", point.x, y);
                }
                None => {
                    let _ = write!(out, "  {}=-", point.x);
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_detail(card: &DetailCard) -> String {
    let mut out = format!("{} ({}) on {}\n", card.location, card.iso_code, card.date);
    if let Some(flag) = &card.flag_url {
        let _ = writeln!(out, "  Flag: {flag}");
    }
    for (label, value) in &card.rows {
        let _ = writeln!(out, "  {label}: {value}");
    }
    out
}

pub fn render_report(report: &IngestReport) -> String {
    format!(
        "{} records, {} countries, {} dates ({} to {}); skipped {} of {} lines ({:.1}%), {} without flag",
        report.records,
        report.countries,
        report.dates,
        report
            .first_date
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
        report
            .last_date
            .map_or_else(|| "-".to_string(), |d| d.to_string()),
        report.skipped_rows(),
        report.data_lines,
        report.skipped_pct(),
        report.unknown_country_codes,
    )
}

/// Serializes any pipeline output as pretty-printed JSON.
pub fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Appends the ranking to a CSV file, one row per country.
///
/// Creates the file with headers if it does not already exist.
pub fn append_leaderboard(path: &str, board: &Leaderboard<'_>) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending leaderboard rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let field = board.metric.field();
    for entry in &board.entries {
        writer.serialize(LeaderboardRow {
            date: board.date,
            metric: board.metric.as_str(),
            rank: entry.rank,
            iso_code: &entry.record.iso_code,
            location: &entry.record.location,
            value: field.format(entry.record),
            color: entry.color,
            flag_url: entry.record.flag_url.as_deref(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DateIndex;
    use crate::leaderboard::rank;
    use crate::record::{CountryDayRecord, Metric};
    use crate::series::build_series;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn index() -> DateIndex {
        let rec = |iso: &str, total: u64, pct: f64| CountryDayRecord {
            id: iso.to_string(),
            date: day(1),
            iso_code: iso.to_string(),
            location: format!("{iso} land"),
            population: None,
            new_vaccinations: None,
            total_vaccinations: total,
            total_vaccinations_per_hundred: pct,
            flag_url: Some(format!("https://flags.test/{iso}.png")),
        };
        DateIndex::build(vec![rec("TUR", 1_500, 5.2), rec("USA", 2_000_000, 10.1)])
    }

    #[test]
    fn test_render_leaderboard() {
        let index = index();
        let board = rank(&index, Metric::TotalVaccinationsPerHundred, day(1), 10).unwrap();
        let text = render_leaderboard(&board);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Per Hundred on 2021-01-01");
        assert!(lines[1].contains("USA"));
        assert!(lines[1].contains("10.1%"));
        assert!(lines[2].contains("TUR"));
    }

    #[test]
    fn test_render_series_marks_missing_and_short() {
        let index = index();
        let set = build_series(&index, Metric::TotalVaccinations, &["USA", "FRA"], day(1), 3);
        let text = render_series(&set);

        assert!(text.starts_with("Total Vaccinations over 1 day(s) (requested 3)"));
        assert!(text.contains("2021-01-01=2000000"));
        assert!(text.contains("FRA"));
        assert!(text.contains("2021-01-01=-"));
    }

    #[test]
    fn test_to_json_leaderboard() {
        let index = index();
        let board = rank(&index, Metric::TotalVaccinations, day(1), 1).unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&board).unwrap()).unwrap();

        assert_eq!(json["date"], "2021-01-01");
        assert_eq!(json["metric"], "total_vaccinations");
        assert_eq!(json["entries"][0]["record"]["iso_code"], "USA");
        assert_eq!(json["entries"][0]["color"], "#6930c3");
    }

    #[test]
    fn test_append_leaderboard_writes_header_once() {
        let path = temp_path("vaxboard_test_leaderboard.csv");
        let _ = fs::remove_file(&path);

        let index = index();
        let board = rank(&index, Metric::TotalVaccinations, day(1), 10).unwrap();
        append_leaderboard(&path, &board).unwrap();
        append_leaderboard(&path, &board).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("date,")).count(),
            1
        );
        assert!(lines[1].contains("\"2,000,000\""));

        fs::remove_file(&path).unwrap();
    }
}
