//! Time utility functions

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use thiserror::Error;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// One `<amount><unit>` token of a period string
static PERIOD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(mo|min|y|w|d|h|m|s)").expect("period token pattern is valid")
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("Invalid time '{0}': expected RFC 3339, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")]
    Datetime(String),

    #[error("Invalid period '{0}': expected tokens like 1y, 2mo, 3w, 4d, 5h, 6m, 7s")]
    Period(String),
}

/// Convert seconds since Unix epoch to DateTime<Utc>
pub fn secs_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Convert a DateTime<Utc> to a protobuf timestamp (second precision)
pub fn to_timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: 0,
    }
}

/// Convert a number of seconds to a protobuf duration
pub fn to_duration(secs: i64) -> prost_types::Duration {
    prost_types::Duration {
        seconds: secs,
        nanos: 0,
    }
}

/// Parse an absolute time given on the command line or in a config file.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD` (the last two as UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc());
    }

    Err(TimeParseError::Datetime(s.to_string()))
}

/// Parse a period such as `1y`, `2w3d` or `36h` into a duration.
///
/// Units: `y` (365 days), `mo` (30 days), `w`, `d`, `h`, `m`/`min`, `s`.
/// The whole string must consist of tokens; anything else is rejected.
pub fn parse_period(s: &str) -> Result<TimeDelta, TimeParseError> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(TimeParseError::Period(s.to_string()));
    }

    let mut total: i64 = 0;
    let mut consumed = 0;

    for caps in PERIOD_TOKEN.captures_iter(&compact) {
        let whole = caps.get(0).ok_or_else(|| TimeParseError::Period(s.to_string()))?;
        if whole.start() != consumed {
            return Err(TimeParseError::Period(s.to_string()));
        }
        consumed = whole.end();

        let amount: i64 = caps[1]
            .parse()
            .map_err(|_| TimeParseError::Period(s.to_string()))?;
        let unit = match &caps[2] {
            "y" => 365 * SECS_PER_DAY,
            "mo" => 30 * SECS_PER_DAY,
            "w" => 7 * SECS_PER_DAY,
            "d" => SECS_PER_DAY,
            "h" => SECS_PER_HOUR,
            "m" | "min" => SECS_PER_MINUTE,
            _ => 1,
        };
        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| TimeParseError::Period(s.to_string()))?;
    }

    if consumed != compact.len() {
        return Err(TimeParseError::Period(s.to_string()));
    }

    TimeDelta::try_seconds(total).ok_or_else(|| TimeParseError::Period(s.to_string()))
}
