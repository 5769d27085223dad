use chrono::NaiveDateTime;

use crate::deadline;
use crate::task::TaskRecord;

/// Number of incomplete tasks that are due at or before `now`.
pub fn count_overdue<'a, I>(tasks: I, now: NaiveDateTime) -> usize
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    tasks
        .into_iter()
        .filter(|task| !task.completed && deadline::evaluate(task, now).is_overdue)
        .count()
}
