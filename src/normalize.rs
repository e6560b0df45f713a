//! Turns raw CSV rows into [`CountryDayRecord`]s.
//!
//! Numeric coercion takes the longest numeric prefix of a field, so `"1234.0"`
//! coerces to `1234` as an integer. A field with no numeric prefix is unknown.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::country::FlagUrls;
use crate::error::Anomaly;
use crate::parser::RawRow;
use crate::record::CountryDayRecord;

/// Reserved code for the aggregate world row.
pub const WORLD_ISO_CODE: &str = "OWID_WRL";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of normalizing one [`RawRow`].
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A usable record, possibly with a recovered anomaly attached.
    Record {
        record: CountryDayRecord,
        anomaly: Option<Anomaly>,
    },
    /// The aggregate world row; dropped silently.
    WorldAggregate,
    /// The row could not be used at all.
    Rejected(Anomaly),
}

/// Applies defaulting and coercion rules to raw rows.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    flags: FlagUrls,
}

impl RecordNormalizer {
    pub fn new(flags: FlagUrls) -> Self {
        Self { flags }
    }

    pub fn normalize(&self, row: &RawRow) -> Normalized {
        let iso_code = row.get("iso_code").unwrap_or_default();
        if iso_code == WORLD_ISO_CODE {
            return Normalized::WorldAggregate;
        }

        let raw_date = row.get("date").unwrap_or_default();
        let Ok(date) = NaiveDate::parse_from_str(raw_date.trim(), DATE_FORMAT) else {
            debug!(line = row.index, date = raw_date, "Rejecting row with invalid date");
            return Normalized::Rejected(Anomaly::InvalidDate {
                line: row.index,
                value: raw_date.to_string(),
            });
        };

        let total_vaccinations = match non_empty(row.get("total_vaccinations")) {
            None => 0,
            Some(raw) => parse_int_prefix(raw)
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or_else(|| {
                    warn!(line = row.index, value = raw, "Unusable total_vaccinations, using 0");
                    0
                }),
        };

        let total_vaccinations_per_hundred = match non_empty(row.get("total_vaccinations_per_hundred")) {
            None => 0.0,
            Some(raw) => parse_float_prefix(raw)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or_else(|| {
                    warn!(
                        line = row.index,
                        value = raw,
                        "Unusable total_vaccinations_per_hundred, using 0"
                    );
                    0.0
                }),
        };

        let flag_url = self.flags.for_iso3(iso_code);
        let anomaly = flag_url.is_none().then(|| {
            debug!(line = row.index, iso_code, "No 2-letter code, omitting flag");
            Anomaly::UnknownCountryCode {
                line: row.index,
                iso_code: iso_code.to_string(),
            }
        });

        let record = CountryDayRecord {
            id: row.index.to_string(),
            date,
            iso_code: iso_code.to_string(),
            location: row.get("location").unwrap_or_default().to_string(),
            population: row.get("population").and_then(parse_int_prefix),
            new_vaccinations: row.get("new_vaccinations").and_then(parse_int_prefix),
            total_vaccinations,
            total_vaccinations_per_hundred,
            flag_url,
        };

        Normalized::Record { record, anomaly }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Leading optional sign followed by decimal digits, ignoring leading whitespace.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Longest prefix of the form `[+-]digits[.digits][e[+-]digits]`.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }

    s[..end].parse().ok()
}
