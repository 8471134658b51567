//! Project window: the date span a chart opens on.

use crate::dates::CalendarDate;
use crate::task::{NormalizedTask, ProjectWindow};

/// Min start and max end over the roots and their direct children.
///
/// Grandchildren are not visited. With no dates at all, both bounds are `now`.
pub fn compute_project_window(roots: &[NormalizedTask], now: CalendarDate) -> ProjectWindow {
    let dates: Vec<CalendarDate> = roots
        .iter()
        .flat_map(|root| std::iter::once(root).chain(root.children.iter().flatten()))
        .flat_map(|t| [t.start_date, t.end_date])
        .flatten()
        .collect();

    match (dates.iter().min(), dates.iter().max()) {
        (Some(&start_date), Some(&end_date)) => ProjectWindow { start_date, end_date },
        _ => ProjectWindow { start_date: now, end_date: now },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::task::{RawDate, TaskId, TaskRecord};
    use chrono::{Duration, TimeZone, Utc};

    fn rec(id: i64, parent: Option<i64>, start: &str, end: &str) -> TaskRecord {
        let mut r = TaskRecord::new(id);
        r.parent = parent.map(TaskId::Num);
        r.start = Some(RawDate::Text(start.into()));
        r.end = Some(RawDate::Text(end.into()));
        r
    }

    fn day(y: i32, m: u32, d: u32) -> CalendarDate {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_spans_roots_and_children() {
        let forest = build_hierarchy(&[
            rec(1, None, "2025-01-05", "2025-01-08"),
            rec(2, Some(1), "2025-01-01", "2025-01-03"),
            rec(3, None, "2025-01-06", "2025-01-20"),
        ]);
        let w = compute_project_window(&forest, day(2030, 1, 1));
        assert_eq!(w.start_date, day(2025, 1, 1));
        assert_eq!(w.end_date, day(2025, 1, 20));
    }

    #[test]
    fn test_grandchildren_are_ignored() {
        let forest = build_hierarchy(&[
            rec(1, None, "2025-01-05", "2025-01-08"),
            rec(2, Some(1), "2025-01-05", "2025-01-06"),
            rec(3, Some(2), "2024-06-01", "2026-06-01"),
        ]);
        let w = compute_project_window(&forest, day(2030, 1, 1));
        assert_eq!(w.start_date, day(2025, 1, 5));
        assert_eq!(w.end_date, day(2025, 1, 8));
    }

    #[test]
    fn test_empty_window_defaults_to_now() {
        let now = day(2026, 10, 19);
        let w = compute_project_window(&[], now);
        assert_eq!(w, ProjectWindow { start_date: now, end_date: now });

        let dateless = build_hierarchy(&[TaskRecord::new(1)]);
        assert_eq!(compute_project_window(&dateless, now).start_date, now);
    }

    #[test]
    fn test_window_now_uses_wall_clock() {
        let before = Utc::now();
        let w = compute_project_window(&[], Utc::now());
        let after = Utc::now();
        assert!(w.start_date >= before && w.start_date <= after + Duration::seconds(1));
        assert_eq!(w.start_date, w.end_date);
    }
}
