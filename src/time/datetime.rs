//! Timestamp parsing shared by all metadata sources

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats without an offset, tried in order
const NAIVE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y:%m:%d %H:%M",
    "%Y-%m-%d %H:%M",
];

/// Formats carrying a UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%:z",
    "%Y:%m:%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Date-only formats
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y:%m:%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse a metadata timestamp into a wall-clock date and time
///
/// Offsets are not applied: `2024-01-15T23:30:00-05:00` stays on the 15th.
/// Returns `None` for anything that is not a valid instant, including the
/// `0000:00:00 00:00:00` placeholder cameras write when the clock is unset.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"').trim();
    // MediaInfo style: "UTC 2024-01-15 14:30:00"
    let s = s.strip_prefix("UTC ").unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_local());
        }
    }

    // A trailing Z without offset support in the format
    let s = s.strip_suffix('Z').unwrap_or(s);

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
