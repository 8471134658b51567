//! Display status for a task, computed on demand.

use crate::dates::CalendarDate;
use crate::fields::TaskStatus;
use crate::task::NormalizedTask;

/// First match wins: completed, then late, then started.
pub fn derive_status(
    percent_done: f64,
    start_date: Option<CalendarDate>,
    deadline: Option<CalendarDate>,
    now: CalendarDate,
) -> TaskStatus {
    if percent_done >= 100.0 {
        TaskStatus::Completed
    } else if deadline.is_some_and(|d| now > d) {
        TaskStatus::Late
    } else if start_date.is_some_and(|s| now >= s) {
        TaskStatus::Started
    } else {
        TaskStatus::NotStarted
    }
}

pub fn task_status(task: &NormalizedTask, now: CalendarDate) -> TaskStatus {
    derive_status(task.percent_done, task.start_date, task.deadline, now)
}
