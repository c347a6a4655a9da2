//! Tolerant date-time parsing.
//!
//! Used for JSON timestamps and for `>`/`<` comparisons in queries. Values without an
//! offset are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%b/%Y:%H:%M:%S",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%d/%b/%Y:%H:%M:%S %z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a date-time in any of the common log layouts
///
/// Accepts RFC 3339, RFC 2822, ISO-like layouts with or without `T`, fractional
/// seconds (also with a `,` separator), numeric offsets, and bare dates (midnight).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // log4j style "2024-01-29 10:00:00,123"
    let normalized;
    let text = if text.len() > 19 && text.as_bytes()[19] == b',' {
        normalized = format!("{}.{}", &text[..19], &text[20..]);
        normalized.as_str()
    } else {
        text
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    DateTime::parse_from_rfc2822(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interpret a JSON number as Unix epoch seconds, or milliseconds when it is too large
/// to be seconds
pub(crate) fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= 1e11 {
        value
    } else {
        value * 1000.0
    };
    DateTime::from_timestamp_millis(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc3339_with_zone() {
        assert_eq!(
            parse_timestamp("2024-01-29T15:20:00Z"),
            Some(utc(2024, 1, 29, 15, 20, 0))
        );
        assert_eq!(
            parse_timestamp("2024-01-29T17:20:00+02:00"),
            Some(utc(2024, 1, 29, 15, 20, 0))
        );
    }

    #[test]
    fn test_naive_layouts_assume_utc() {
        let expected = Some(utc(2024, 1, 29, 15, 20, 0));
        assert_eq!(parse_timestamp("2024-01-29 15:20:00"), expected);
        assert_eq!(parse_timestamp("2024-01-29T15:20:00"), expected);
        assert_eq!(parse_timestamp("2024/01/29 15:20:00"), expected);
    }

    #[test]
    fn test_fractional_seconds_with_comma() {
        let parsed = parse_timestamp("2024-01-29 15:20:00,250").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2024-01-01"), Some(utc(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("42"), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        let expected = Some(utc(2024, 1, 29, 15, 20, 0));
        assert_eq!(from_epoch(1_706_541_600.0), expected);
        assert_eq!(from_epoch(1_706_541_600_000.0), expected);
        assert_eq!(from_epoch(f64::NAN), None);
    }
}
