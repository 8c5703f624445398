//! Utility functions for date parsing and query defaults.

use chrono::{DateTime, NaiveDate};

use crate::{DateFilter, DateRange, ProgressError};

/// Parse a calendar date from a query value.
///
/// Accepts:
/// - YYYY-MM-DD
/// - RFC3339 datetime (the date part is kept)
/// - Naive datetime YYYY-MM-DDTHH:MM:SS
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    None
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ProgressError> {
    raw.map(|raw| {
        parse_date(raw).ok_or_else(|| ProgressError::Validation(format!("invalid {name}: {raw}")))
    })
    .transpose()
}

/// Resolve optional `start_date`/`end_date` query values. A missing end is
/// `today` and a missing start is `window_days` before `today`, whatever the
/// end. A defaulted start that lands after a given end is rejected.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
    window_days: u32,
) -> Result<DateRange, ProgressError> {
    let end = parse_bound(end, "end_date")?.unwrap_or(today);
    let start = parse_bound(start, "start_date")?
        .unwrap_or_else(|| DateRange::trailing(today, window_days).start);
    DateRange::new(start, end)
}

/// Listing filter from optional query values. Only the supplied bounds
/// apply; nothing is defaulted.
pub fn date_filter(start: Option<&str>, end: Option<&str>) -> Result<DateFilter, ProgressError> {
    let filter = DateFilter {
        start: parse_bound(start, "start_date")?,
        end: parse_bound(end, "end_date")?,
    };
    if let (Some(s), Some(e)) = (filter.start, filter.end) {
        DateRange::new(s, e)?;
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_date_accepts_common_shapes() {
        assert_eq!(parse_date("2025-12-15"), Some(d("2025-12-15")));
        assert_eq!(parse_date("2025-12-15T10:30:00"), Some(d("2025-12-15")));
        assert_eq!(parse_date("2025-12-15T10:30:00Z"), Some(d("2025-12-15")));
        assert!(parse_date("not-a-date").is_none());
    }

    #[test]
    fn missing_bounds_default_to_trailing_window() {
        let r = resolve_range(None, None, d("2024-03-31"), 30).unwrap();
        assert_eq!(r.start, d("2024-03-01"));
        assert_eq!(r.end, d("2024-03-31"));
    }

    #[test]
    fn start_only_runs_to_today() {
        let r = resolve_range(Some("2024-01-01"), None, d("2024-03-31"), 30).unwrap();
        assert_eq!(r.start, d("2024-01-01"));
        assert_eq!(r.end, d("2024-03-31"));
    }

    #[test]
    fn inverted_or_malformed_bounds_fail() {
        assert!(resolve_range(Some("2024-04-01"), Some("2024-03-01"), d("2024-05-01"), 30).is_err());
        assert!(matches!(
            resolve_range(Some("yesterday"), None, d("2024-05-01"), 30),
            Err(ProgressError::Validation(_))
        ));
    }

    #[test]
    fn end_only_keeps_window_anchored_on_today() {
        let r = resolve_range(None, Some("2024-04-20"), d("2024-05-01"), 30).unwrap();
        assert_eq!(r.start, d("2024-04-01"));
        assert_eq!(r.end, d("2024-04-20"));
    }

    #[test]
    fn end_before_default_start_is_rejected() {
        assert!(matches!(
            resolve_range(None, Some("2024-03-01"), d("2024-05-01"), 30),
            Err(ProgressError::Validation(_))
        ));
    }

    #[test]
    fn date_filter_keeps_only_supplied_bounds() {
        assert_eq!(date_filter(None, None).unwrap(), DateFilter::ALL);

        let end_only = date_filter(None, Some("2024-04-30")).unwrap();
        assert_eq!(end_only.start, None);
        assert!(end_only.contains(d("2024-01-15")));

        let start_only = date_filter(Some("2024-04-01"), None).unwrap();
        assert_eq!(start_only.end, None);
        assert!(start_only.contains(d("2099-01-01")));

        assert!(date_filter(Some("2024-04-02"), Some("2024-04-01")).is_err());
        assert!(date_filter(None, Some("later")).is_err());
    }
}
