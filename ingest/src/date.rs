//! Lenient transaction-date parsing.
//!
//! Statements disagree on date formats, and model output is only mostly
//! ISO 8601. Callers substitute "now" when nothing here matches; a bad date
//! never rejects a row on its own.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m/%d/%y", "%Y/%m/%d"];

/// Parse an RFC 3339 timestamp or a bare date (midnight UTC) from a cell.
pub fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parses_rfc3339_timestamp() {
        let dt = parse_flexible("2023-10-15T08:30:00Z").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 10);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_parses_bare_iso_date_as_midnight_utc() {
        let dt = parse_flexible("2024-01-16").unwrap();
        assert_eq!(dt.day(), 16);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parses_us_slash_date() {
        let dt = parse_flexible("01/31/2024").unwrap();
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 31);
    }

    #[test]
    fn test_parses_day_first_when_us_order_is_impossible() {
        let dt = parse_flexible("25/12/2024").unwrap();
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 25);
    }

    #[test]
    fn test_rejects_noise() {
        assert!(parse_flexible("").is_none());
        assert!(parse_flexible("yesterday").is_none());
        assert!(parse_flexible("2024-13-40").is_none());
    }
}
