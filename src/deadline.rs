//! Time-until-due computation for a single task.

use chrono::NaiveDateTime;

use crate::task::TaskRecord;
use crate::time_format;

const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_DAY: u64 = 86_400_000;

/// Whole days, hours and minutes of an overdue span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayBreakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl DelayBreakdown {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            days: ms / MS_PER_DAY,
            hours: (ms / MS_PER_HOUR) % 24,
            minutes: (ms / MS_PER_MINUTE) % 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Negative once the due instant has passed.
    pub ms_until_due: i64,
    pub is_overdue: bool,
    /// Present only when overdue.
    pub delay: Option<DelayBreakdown>,
}

/// The local wall-clock instant the task falls due.
pub fn due_instant(task: &TaskRecord) -> NaiveDateTime {
    task.due_date
        .and_time(time_format::to_naive_time(task.due_time, task.meridiem))
}

/// Evaluates `task` against `now`. A task is overdue from the exact
/// instant it is due.
pub fn evaluate(task: &TaskRecord, now: NaiveDateTime) -> Evaluation {
    let ms_until_due = (due_instant(task) - now).num_milliseconds();
    let is_overdue = ms_until_due <= 0;
    let delay = is_overdue.then(|| DelayBreakdown::from_millis(ms_until_due.unsigned_abs()));
    Evaluation {
        ms_until_due,
        is_overdue,
        delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn task(date: &str, time: &str, meridiem: &str) -> TaskRecord {
        TaskRecord::from_input("t", date, time, meridiem).unwrap()
    }

    #[test]
    fn due_instant_uses_24_hour_conversion() {
        assert_eq!(due_instant(&task("2024-01-01", "12:00", "AM")), at(2024, 1, 1, 0, 0));
        assert_eq!(due_instant(&task("2024-01-01", "12:30", "PM")), at(2024, 1, 1, 12, 30));
        assert_eq!(due_instant(&task("2024-01-01", "11:59", "PM")), at(2024, 1, 1, 23, 59));
    }

    #[test]
    fn overdue_across_midnight() {
        let eval = evaluate(&task("2024-01-01", "11:59", "PM"), at(2024, 1, 2, 0, 5));
        assert!(eval.is_overdue);
        assert_eq!(eval.ms_until_due, -6 * 60_000);
        assert_eq!(
            eval.delay,
            Some(DelayBreakdown {
                days: 0,
                hours: 0,
                minutes: 6
            })
        );
    }

    #[test]
    fn due_now_counts_as_overdue() {
        let eval = evaluate(&task("2024-06-15", "3:00", "PM"), at(2024, 6, 15, 15, 0));
        assert!(eval.is_overdue);
        assert_eq!(eval.ms_until_due, 0);
        assert_eq!(eval.delay, Some(DelayBreakdown::default()));
    }

    #[test]
    fn one_millisecond_early_is_not_overdue() {
        let now = at(2024, 6, 15, 15, 0) - TimeDelta::milliseconds(1);
        let eval = evaluate(&task("2024-06-15", "3:00", "PM"), now);
        assert!(!eval.is_overdue);
        assert_eq!(eval.ms_until_due, 1);
        assert_eq!(eval.delay, None);
    }

    #[test]
    fn breakdown_splits_days_hours_minutes() {
        let ms = 2 * MS_PER_DAY + 5 * MS_PER_HOUR + 7 * MS_PER_MINUTE + 59_999;
        assert_eq!(
            DelayBreakdown::from_millis(ms),
            DelayBreakdown {
                days: 2,
                hours: 5,
                minutes: 7
            }
        );
    }

    #[test]
    fn long_overdue_task() {
        let eval = evaluate(&task("2024-01-01", "9:00", "AM"), at(2024, 1, 4, 10, 30));
        assert_eq!(
            eval.delay,
            Some(DelayBreakdown {
                days: 3,
                hours: 1,
                minutes: 30
            })
        );
    }
}
