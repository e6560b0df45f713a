//! Runtime configuration read from the environment (and `.env`).

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::leaderboard;
use crate::series;

pub const DEFAULT_SOURCE_URL: &str = "https://covid.ourworldindata.org/data/owid-covid-data.csv";
pub const DEFAULT_FLAG_URL_TEMPLATE: &str = "https://flagcdn.com/64x48/{iso2}.png";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_url: String,
    pub flag_url_template: String,
    pub leaderboard_limit: usize,
    pub series_days: usize,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            flag_url_template: DEFAULT_FLAG_URL_TEMPLATE.to_string(),
            leaderboard_limit: leaderboard::DEFAULT_LIMIT,
            series_days: series::DEFAULT_DAYS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Reads `VAXBOARD_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep their
    /// defaults; unparseable numbers are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            source_url: lookup("VAXBOARD_SOURCE_URL").unwrap_or(defaults.source_url),
            flag_url_template: lookup("VAXBOARD_FLAG_URL_TEMPLATE")
                .unwrap_or(defaults.flag_url_template),
            leaderboard_limit: parse_or(
                &lookup,
                "VAXBOARD_LEADERBOARD_LIMIT",
                defaults.leaderboard_limit,
            ),
            series_days: parse_or(&lookup, "VAXBOARD_SERIES_DAYS", defaults.series_days),
            http_timeout: Duration::from_secs(parse_or(
                &lookup,
                "VAXBOARD_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring invalid config value");
            default
        }),
    }
}
