//! Field parsers for incident CSV cells.
//!
//! Each parser returns a typed failure instead of a silent null so the
//! loader can count and drop rows by reason.

use chrono::{NaiveDate, NaiveDateTime};
use fire_map_incident_models::{AreaError, TimestampError};

/// Date-time layouts accepted for the alert timestamp, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, interpreted as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses an alert timestamp cell.
///
/// # Errors
///
/// Returns [`TimestampError::Empty`] for blank cells and
/// [`TimestampError::Unrecognized`] when no accepted layout matches.
pub fn parse_alert_time(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Ok(parsed);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TimestampError::Unrecognized {
            value: value.to_string(),
        })
}

/// Parses a burned-area cell in square metres.
///
/// Accepts a decimal comma and space/no-break-space digit grouping
/// (`"1 234,5"`).
///
/// # Errors
///
/// Returns [`AreaError::Empty`] for blank cells and [`AreaError::Invalid`]
/// for anything that is not a finite number.
pub fn parse_burned_area(raw: &str) -> Result<f64, AreaError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AreaError::Empty);
    }

    let normalized: String = value
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized
        .parse::<f64>()
        .ok()
        .filter(|area| area.is_finite())
        .ok_or_else(|| AreaError::Invalid {
            value: value.to_string(),
        })
}

/// Trims a cell, mapping blank cells to `None`.
#[must_use]
pub fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_datetime() {
        let dt = parse_alert_time("2019-07-14 16:45:00").unwrap();
        assert_eq!(dt.to_string(), "2019-07-14 16:45:00");
    }

    #[test]
    fn parses_datetime_with_fractional_seconds() {
        let dt = parse_alert_time("2019-07-14T16:45:00.250").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2019-07-14 16:45:00");
    }

    #[test]
    fn parses_french_datetime() {
        let dt = parse_alert_time(" 03/08/2021 09:05 ").unwrap();
        assert_eq!(dt.to_string(), "2021-08-03 09:05:00");
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let dt = parse_alert_time("2005-06-30").unwrap();
        assert_eq!(dt.to_string(), "2005-06-30 00:00:00");
    }

    #[test]
    fn rejects_blank_and_garbage_timestamps() {
        assert_eq!(parse_alert_time("  "), Err(TimestampError::Empty));
        assert_eq!(
            parse_alert_time("not-a-date"),
            Err(TimestampError::Unrecognized {
                value: "not-a-date".to_string()
            })
        );
        assert!(parse_alert_time("2019-02-30 10:00:00").is_err());
    }

    #[test]
    fn parses_burned_area_variants() {
        assert!((parse_burned_area("5000").unwrap() - 5_000.0).abs() < f64::EPSILON);
        assert!((parse_burned_area("1 234,5").unwrap() - 1_234.5).abs() < f64::EPSILON);
        assert!((parse_burned_area("12.75").unwrap() - 12.75).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_burned_area() {
        assert_eq!(parse_burned_area(""), Err(AreaError::Empty));
        assert!(matches!(
            parse_burned_area("abc"),
            Err(AreaError::Invalid { .. })
        ));
        assert!(parse_burned_area("inf").is_err());
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  Vigie "), Some("Vigie".to_string()));
        assert_eq!(non_empty("   "), None);
    }
}
