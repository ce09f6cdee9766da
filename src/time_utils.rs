// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Render a page timestamp as a US short date (`M/D/YYYY`) of its UTC day.
///
/// Accepts RFC 3339, `YYYY-MM-DD` and epoch milliseconds. Anything else is
/// returned unchanged.
pub fn format_us_short_date(raw: &str) -> String {
    let raw = raw.trim();
    match parse_calendar_date(raw) {
        Some(date) => format!("{}/{}/{}", date.month(), date.day(), date.year()),
        None => raw.to_string(),
    }
}

fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only() {
        assert_eq!(format_us_short_date("2024-01-01"), "1/1/2024");
    }

    #[test]
    fn test_rfc3339_uses_utc_day() {
        assert_eq!(format_us_short_date("2024-12-31T23:30:00-02:00"), "1/1/2025");
        assert_eq!(format_us_short_date("2024-03-05T10:00:00Z"), "3/5/2024");
    }

    #[test]
    fn test_epoch_millis() {
        assert_eq!(format_us_short_date("1704067200000"), "1/1/2024");
    }

    #[test]
    fn test_unparseable_passthrough() {
        assert_eq!(format_us_short_date("yesterday"), "yesterday");
        assert_eq!(format_us_short_date(""), "");
    }
}
