//! The normalized per-country, per-day record and the fields callers select on.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One country's statistics on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryDayRecord {
    /// Stable rendering key taken from the source line index.
    pub id: String,
    pub date: NaiveDate,
    pub iso_code: String,
    pub location: String,
    /// `None` when the source value is absent or not numeric.
    pub population: Option<i64>,
    /// `None` when the source value is absent or not numeric.
    pub new_vaccinations: Option<i64>,
    pub total_vaccinations: u64,
    pub total_vaccinations_per_hundred: f64,
    /// `None` when the country code has no 2-letter mapping.
    pub flag_url: Option<String>,
}

/// Comparable statistic that drives ranking and series extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalVaccinations,
    #[default]
    TotalVaccinationsPerHundred,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::TotalVaccinationsPerHundred, Metric::TotalVaccinations];

    /// CSV column name for this metric.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::TotalVaccinations => "total_vaccinations",
            Metric::TotalVaccinationsPerHundred => "total_vaccinations_per_hundred",
        }
    }

    /// Short caption for toggles and table headers.
    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalVaccinations => "Total Vaccinations",
            Metric::TotalVaccinationsPerHundred => "Per Hundred",
        }
    }

    pub fn value(self, record: &CountryDayRecord) -> f64 {
        match self {
            Metric::TotalVaccinations => record.total_vaccinations as f64,
            Metric::TotalVaccinationsPerHundred => record.total_vaccinations_per_hundred,
        }
    }

    pub fn field(self) -> Field {
        match self {
            Metric::TotalVaccinations => Field::TotalVaccinations,
            Metric::TotalVaccinationsPerHundred => Field::TotalVaccinationsPerHundred,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownMetric(s.to_string()))
    }
}

/// Any numeric record field that can be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Population,
    NewVaccinations,
    TotalVaccinations,
    TotalVaccinationsPerHundred,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Population => "Population",
            Field::NewVaccinations => "New vaccinations",
            Field::TotalVaccinations => "Total vaccinations",
            Field::TotalVaccinationsPerHundred => "Total vaccinations per hundred",
        }
    }

    /// Display string for this field of `record`.
    ///
    /// Missing and zero values render as `-`. Per-hundred values get a `%` suffix,
    /// everything else is a thousands-grouped integer.
    pub fn format(self, record: &CountryDayRecord) -> String {
        match self {
            Field::Population => format_count(record.population),
            Field::NewVaccinations => format_count(record.new_vaccinations),
            Field::TotalVaccinations => format_count(i64::try_from(record.total_vaccinations).ok()),
            Field::TotalVaccinationsPerHundred => format_percent(record.total_vaccinations_per_hundred),
        }
    }
}

fn format_count(value: Option<i64>) -> String {
    match value {
        Some(v) if v != 0 => group_thousands(v),
        _ => "-".to_string(),
    }
}

fn format_percent(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        "-".to_string()
    } else {
        format!("{value}%")
    }
}

/// Formats an integer with `,` between groups of three digits.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CountryDayRecord {
        CountryDayRecord {
            id: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            iso_code: "TUR".to_string(),
            location: "Turkey".to_string(),
            population: Some(84_339_067),
            new_vaccinations: None,
            total_vaccinations: 1_234_567,
            total_vaccinations_per_hundred: 5.2,
            flag_url: None,
        }
    }

    #[test]
    fn test_metric_round_trips_column_name() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert!(matches!(
            "population".parse::<Metric>(),
            Err(PipelineError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_default_metric_is_per_hundred() {
        assert_eq!(Metric::default(), Metric::TotalVaccinationsPerHundred);
    }

    #[test]
    fn test_metric_value() {
        let r = record();
        assert_eq!(Metric::TotalVaccinations.value(&r), 1_234_567.0);
        assert_eq!(Metric::TotalVaccinationsPerHundred.value(&r), 5.2);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(84_339_067), "84,339,067");
        assert_eq!(group_thousands(-1_234), "-1,234");
    }

    #[test]
    fn test_field_format() {
        let mut r = record();
        assert_eq!(Field::Population.format(&r), "84,339,067");
        assert_eq!(Field::NewVaccinations.format(&r), "-");
        assert_eq!(Field::TotalVaccinations.format(&r), "1,234,567");
        assert_eq!(Field::TotalVaccinationsPerHundred.format(&r), "5.2%");

        r.total_vaccinations = 0;
        r.total_vaccinations_per_hundred = 0.0;
        assert_eq!(Field::TotalVaccinations.format(&r), "-");
        assert_eq!(Field::TotalVaccinationsPerHundred.format(&r), "-");

        r.total_vaccinations_per_hundred = 10.0;
        assert_eq!(Field::TotalVaccinationsPerHundred.format(&r), "10%");
    }
}
