//! Provider value parsing and fetch-window arithmetic.
//!
//! The provider reports every reading as a string. A literal `"."` (and any
//! other non-numeric sentinel) means the reading is missing and maps to
//! `None`. Numeric text that parses to a non-finite float (`"NaN"`, `"inf"`)
//! is treated the same way, so a stored value is always either a finite
//! number or `NULL`.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fred_sync_core::observation::{observation_start, parse_value};
//!
//! assert_eq!(parse_value("3.5"), Some(3.5));
//! assert_eq!(parse_value("."), None);
//!
//! let last = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
//! assert_eq!(
//!     observation_start(Some(last)),
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
//! );
//! ```

use chrono::{Days, NaiveDate};

use crate::models::{epoch_start, Observation, ProviderObservation};

/// Parse a raw provider value into a reading.
///
/// Returns `None` for `"."`, empty strings, non-numeric text, and
/// non-finite numbers.
pub fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First date to request for a series whose latest stored date is `max_date`.
///
/// `max_date + 1 day`, or the epoch start when nothing is stored yet.
pub fn observation_start(max_date: Option<NaiveDate>) -> NaiveDate {
    match max_date {
        Some(d) => d.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
        None => epoch_start(),
    }
}

/// Map provider points onto store rows for `series_id`.
pub fn to_observations(series_id: &str, points: &[ProviderObservation]) -> Vec<Observation> {
    points
        .iter()
        .map(|p| Observation {
            series_id: series_id.to_string(),
            date: p.date,
            value: parse_value(&p.raw_value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_value("21000"), Some(21000.0));
        assert_eq!(parse_value("3.5"), Some(3.5));
        assert_eq!(parse_value("-0.25"), Some(-0.25));
        assert_eq!(parse_value(" 4.0 "), Some(4.0));
    }

    #[test]
    fn test_parse_zero_is_a_reading() {
        assert_eq!(parse_value("0"), Some(0.0));
        assert_eq!(parse_value("0.000"), Some(0.0));
    }

    #[test]
    fn test_parse_sentinels_are_missing() {
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("   "), None);
        assert_eq!(parse_value("ND"), None);
        assert_eq!(parse_value("#N/A"), None);
    }

    #[test]
    fn test_parse_non_finite_is_missing() {
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("inf"), None);
        assert_eq!(parse_value("-infinity"), None);
    }

    #[test]
    fn test_start_without_rows_is_epoch() {
        assert_eq!(observation_start(None), date(1900, 1, 1));
    }

    #[test]
    fn test_start_is_day_after_max() {
        assert_eq!(observation_start(Some(date(2020, 1, 1))), date(2020, 1, 2));
        assert_eq!(observation_start(Some(date(2023, 12, 31))), date(2024, 1, 1));
        assert_eq!(observation_start(Some(date(2024, 2, 28))), date(2024, 2, 29));
        assert_eq!(observation_start(Some(date(2023, 2, 28))), date(2023, 3, 1));
    }

    #[test]
    fn test_start_saturates_at_max_date() {
        assert_eq!(observation_start(Some(NaiveDate::MAX)), NaiveDate::MAX);
    }

    #[test]
    fn test_to_observations_keeps_nulls() {
        let points = vec![
            ProviderObservation {
                date: date(2020, 1, 1),
                raw_value: "21000".to_string(),
            },
            ProviderObservation {
                date: date(2020, 2, 1),
                raw_value: ".".to_string(),
            },
        ];
        let rows = to_observations("GDP", &points);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].series_id, "GDP");
        assert_eq!(rows[0].value, Some(21000.0));
        assert_eq!(rows[1].date, date(2020, 2, 1));
        assert_eq!(rows[1].value, None);
    }
}
