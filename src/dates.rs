//! Date coercion for task feed fields.
//!
//! Incoming dates are epoch milliseconds or ISO-8601 strings (RFC 3339, naive
//! date-times, or bare `YYYY-MM-DD`). Naive values are read as UTC. Output
//! dates are written at day precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serializer;

use crate::error::{GanttError, Result};
use crate::task::{RawDate, TaskId};

/// A point in time used for scheduling, ordered by instant.
pub type CalendarDate = DateTime<Utc>;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coerce a wire date into a `CalendarDate`.
///
/// `None` stays `None`. Anything that cannot represent a real instant is an
/// `InvalidDate` error; callers decide whether to drop the field.
pub fn normalize_date(value: Option<&RawDate>) -> Result<Option<CalendarDate>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = match value {
        RawDate::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
        RawDate::Fractional(ms) if ms.is_finite() => {
            // Sub-millisecond parts are truncated.
            Utc.timestamp_millis_opt(ms.trunc() as i64).single()
        }
        RawDate::Fractional(_) => None,
        RawDate::Text(s) => parse_date_text(s),
    };
    match parsed {
        Some(d) => Ok(Some(d)),
        None => Err(GanttError::InvalidDate(describe(value))),
    }
}

/// Normalise one date field of a task, dropping it with a warning when it
/// cannot be parsed. Blank values are treated as absent.
pub fn normalize_field(task: &TaskId, field: &str, value: Option<&RawDate>) -> Option<CalendarDate> {
    let value = value.filter(|v| !v.is_blank());
    match normalize_date(value) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("task {task}: dropping `{field}`: {e}");
            None
        }
    }
}

/// Duration in whole days.
///
/// A supplied duration wins unchanged. Otherwise it is `ceil(|end - start|)`
/// in days when both ends are known.
pub fn derive_duration(
    start: Option<CalendarDate>,
    end: Option<CalendarDate>,
    supplied: Option<i64>,
) -> Option<i64> {
    if supplied.is_some() {
        return supplied;
    }
    let (start, end) = (start?, end?);
    let millis = (end - start).num_milliseconds().abs();
    Some((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
}

fn parse_date_text(s: &str) -> Option<CalendarDate> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(d.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn describe(value: &RawDate) -> String {
    match value {
        RawDate::Millis(ms) => format!("{ms} ms"),
        RawDate::Fractional(ms) => format!("{ms} ms"),
        RawDate::Text(s) => format!("{s:?}"),
    }
}

/// `YYYY-MM-DD` form used on the output side.
pub fn format_day(d: &CalendarDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn serialize_day<S: Serializer>(d: &CalendarDate, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_day(d))
}

pub fn serialize_opt_day<S: Serializer>(
    d: &Option<CalendarDate>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => serializer.serialize_str(&format_day(d)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> CalendarDate {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_date_formats() {
        let text = |s: &str| RawDate::Text(s.to_string());
        assert_eq!(normalize_date(None).unwrap(), None);
        assert_eq!(normalize_date(Some(&text("2025-01-04"))).unwrap(), Some(day(2025, 1, 4)));
        assert_eq!(
            normalize_date(Some(&text("2025-12-01T08:00:00Z"))).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(
            normalize_date(Some(&text("2025-12-01T10:00:00+02:00"))).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(
            normalize_date(Some(&text("2025-12-01 08:30:00"))).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 12, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(
            normalize_date(Some(&RawDate::Millis(1_735_689_600_000))).unwrap(),
            Some(day(2025, 1, 1))
        );
        assert_eq!(
            normalize_date(Some(&RawDate::Fractional(1_735_689_600_000.9))).unwrap(),
            Some(day(2025, 1, 1))
        );
    }

    #[test]
    fn test_invalid_dates_are_errors() {
        for bad in ["not a date", "2025-02-30", "2025-13-01"] {
            let r = normalize_date(Some(&RawDate::Text(bad.into())));
            assert!(matches!(r, Err(GanttError::InvalidDate(_))), "{bad} should be rejected");
        }
        assert!(normalize_date(Some(&RawDate::Fractional(f64::NAN))).is_err());
        assert!(normalize_date(Some(&RawDate::Millis(i64::MAX))).is_err());
    }

    #[test]
    fn test_normalize_field_drops_bad_and_blank_values() {
        let id = TaskId::Num(1);
        assert_eq!(normalize_field(&id, "start", Some(&RawDate::Text("garbage".into()))), None);
        assert_eq!(normalize_field(&id, "start", Some(&RawDate::Text(String::new()))), None);
        assert_eq!(
            normalize_field(&id, "start", Some(&RawDate::Text("2025-01-01".into()))),
            Some(day(2025, 1, 1))
        );
    }

    #[test]
    fn test_derive_duration() {
        assert_eq!(derive_duration(Some(day(2025, 1, 1)), Some(day(2025, 1, 4)), None), Some(3));
        // Reversed ends still give a positive span.
        assert_eq!(derive_duration(Some(day(2025, 1, 4)), Some(day(2025, 1, 1)), None), Some(3));
        // Partial days round up.
        let end = Utc.with_ymd_and_hms(2025, 1, 3, 17, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(derive_duration(Some(start), Some(end), None), Some(3));
        assert_eq!(derive_duration(Some(day(2025, 1, 1)), Some(day(2025, 1, 1)), None), Some(0));
        assert_eq!(derive_duration(Some(day(2025, 1, 1)), Some(day(2025, 1, 4)), Some(10)), Some(10));
        assert_eq!(derive_duration(Some(day(2025, 1, 1)), None, None), None);
        assert_eq!(derive_duration(None, None, Some(0)), Some(0));
    }

    #[test]
    fn test_format_day() {
        let d = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(format_day(&d), "2025-03-09");
    }
}
