//! Per-task periodic reminders.
//!
//! Every live task owns one [`Reminder`]. Reminders are plain state machines
//! multiplexed onto the caller's event loop: the loop calls
//! [`ReminderScheduler::tick`] between input polls and each reminder whose
//! period has elapsed runs once. Nothing here spawns threads or sleeps.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};

use crate::deadline::{self, DelayBreakdown};
use crate::notify::NotificationSink;
use crate::overdue;
use crate::task::{TaskEntry, TaskId, TaskRecord};

pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Active,
    /// Terminal. A stopped reminder never polls again.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Task not yet due, or the reminder is already stopped.
    Idle,
    Notified(String),
    /// The task was seen completed; the reminder is now stopped.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Reminder {
    task_id: TaskId,
    state: ReminderState,
    next_poll: NaiveDateTime,
}

impl Reminder {
    pub fn start(task_id: TaskId, now: NaiveDateTime, interval: TimeDelta) -> Self {
        Self {
            task_id,
            state: ReminderState::Active,
            next_poll: now + interval,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    pub fn next_poll(&self) -> NaiveDateTime {
        self.next_poll
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.state == ReminderState::Active && now >= self.next_poll
    }

    /// Runs one poll against the current state of `task`.
    ///
    /// Completion is checked before anything else, and the tick that
    /// observes it never notifies. `delayed_tasks` is only called when a
    /// message is actually composed.
    pub fn poll<F>(&mut self, task: &TaskRecord, delayed_tasks: F, now: NaiveDateTime) -> PollOutcome
    where
        F: FnOnce() -> usize,
    {
        if self.state == ReminderState::Stopped {
            return PollOutcome::Idle;
        }
        if task.completed {
            self.state = ReminderState::Stopped;
            return PollOutcome::Stopped;
        }

        let evaluation = deadline::evaluate(task, now);
        match evaluation.delay {
            Some(delay) if evaluation.is_overdue => PollOutcome::Notified(compose_reminder(
                &task.text,
                delay,
                Some(delayed_tasks()),
            )),
            _ => PollOutcome::Idle,
        }
    }

    /// Moves `next_poll` past `now`, skipping any periods that were missed.
    fn advance(&mut self, now: NaiveDateTime, interval: TimeDelta) {
        if now < self.next_poll {
            return;
        }
        let period = interval.num_milliseconds().max(1);
        let behind = (now - self.next_poll).num_milliseconds();
        let periods = behind / period + 1;
        self.next_poll += TimeDelta::milliseconds(period * periods);
    }
}

/// What a single [`ReminderScheduler::tick`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub polled: usize,
    pub notified: usize,
    pub stopped: usize,
    /// Reminders whose task no longer exists.
    pub orphaned: usize,
}

/// Owns every live reminder, keyed by task.
#[derive(Debug)]
pub struct ReminderScheduler {
    interval: TimeDelta,
    reminders: BTreeMap<TaskId, Reminder>,
}

impl Default for ReminderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REMINDER_INTERVAL)
    }
}

impl ReminderScheduler {
    pub fn new(interval: Duration) -> Self {
        let interval = TimeDelta::from_std(interval)
            .ok()
            .filter(|delta| *delta > TimeDelta::zero())
            .unwrap_or_else(|| TimeDelta::seconds(DEFAULT_REMINDER_INTERVAL.as_secs() as i64));
        Self {
            interval,
            reminders: BTreeMap::new(),
        }
    }

    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    /// Starts a fresh reminder for `task_id`, discarding any existing one.
    pub fn start(&mut self, task_id: TaskId, now: NaiveDateTime) {
        let reminder = Reminder::start(task_id, now, self.interval);
        if self.reminders.insert(task_id, reminder).is_some() {
            tracing::debug!(task = task_id.0, "replaced existing reminder");
        } else {
            tracing::debug!(task = task_id.0, "reminder started");
        }
    }

    /// Releases the reminder for `task_id`. Returns whether one existed.
    pub fn cancel(&mut self, task_id: TaskId) -> bool {
        let removed = self.reminders.remove(&task_id).is_some();
        if removed {
            tracing::debug!(task = task_id.0, "reminder cancelled");
        }
        removed
    }

    /// `None` once the reminder has stopped or been cancelled.
    pub fn state(&self, task_id: TaskId) -> Option<ReminderState> {
        self.reminders.get(&task_id).map(Reminder::state)
    }

    pub fn is_active(&self, task_id: TaskId) -> bool {
        self.state(task_id) == Some(ReminderState::Active)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// Polls every reminder that is due at `now`, in task order.
    ///
    /// `tasks` is the whole live collection; it is used both to look up each
    /// reminder's task and to count delayed tasks for the message. Stopped
    /// and orphaned reminders are dropped.
    pub fn tick(
        &mut self,
        tasks: &[TaskEntry],
        now: NaiveDateTime,
        sink: &mut dyn NotificationSink,
    ) -> TickReport {
        let interval = self.interval;
        let mut report = TickReport::default();
        let mut finished = Vec::new();

        for (id, reminder) in self.reminders.iter_mut() {
            if !reminder.is_due(now) {
                continue;
            }
            let Some(entry) = tasks.iter().find(|entry| entry.id == *id) else {
                report.orphaned += 1;
                finished.push(*id);
                continue;
            };

            report.polled += 1;
            let delayed = || overdue::count_overdue(tasks.iter().map(|entry| &entry.record), now);
            match reminder.poll(&entry.record, delayed, now) {
                PollOutcome::Notified(message) => {
                    report.notified += 1;
                    sink.notify(&message);
                }
                PollOutcome::Stopped => {
                    report.stopped += 1;
                    finished.push(*id);
                }
                PollOutcome::Idle => {}
            }
            reminder.advance(now, interval);
        }

        for id in finished {
            self.reminders.remove(&id);
        }
        if report.polled > 0 || report.orphaned > 0 {
            tracing::debug!(
                polled = report.polled,
                notified = report.notified,
                stopped = report.stopped,
                orphaned = report.orphaned,
                "reminder tick"
            );
        }
        report
    }
}

/// `Reminder: {text} is due now!` plus a delay clause sized to the delay,
/// and the delayed-task count when one is given.
pub fn compose_reminder(text: &str, delay: DelayBreakdown, delayed_tasks: Option<usize>) -> String {
    let mut message = format!("Reminder: {text} is due now!");
    if delay.days > 0 {
        message.push_str(&format!(
            " It is delayed by {} days, {} hours, and {} minutes.",
            delay.days, delay.hours, delay.minutes
        ));
    } else if delay.hours > 0 {
        message.push_str(&format!(
            " It is delayed by {} hours and {} minutes.",
            delay.hours, delay.minutes
        ));
    } else {
        message.push_str(&format!(" It is delayed by {} minutes.", delay.minutes));
    }
    if let Some(count) = delayed_tasks {
        message.push_str(&format!(" There are {count} delayed tasks."));
    }
    message
}

/// One-off check of the whole collection, run when tasks are first shown.
/// Produces a message per overdue, incomplete task, without the count clause.
pub fn sweep_overdue<'a, I>(tasks: I, now: NaiveDateTime) -> Vec<String>
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    tasks
        .into_iter()
        .filter(|task| !task.completed)
        .filter_map(|task| {
            let delay = deadline::evaluate(task, now).delay?;
            Some(compose_reminder(&task.text, delay, None))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn entry(id: u64, text: &str, date: &str, time: &str, meridiem: &str) -> TaskEntry {
        TaskEntry {
            id: TaskId(id),
            record: TaskRecord::from_input(text, date, time, meridiem).unwrap(),
        }
    }

    #[test]
    fn delay_clause_follows_magnitude() {
        let msg = compose_reminder(
            "A",
            DelayBreakdown {
                days: 2,
                hours: 3,
                minutes: 4,
            },
            Some(5),
        );
        assert_eq!(
            msg,
            "Reminder: A is due now! It is delayed by 2 days, 3 hours, and 4 minutes. There are 5 delayed tasks."
        );

        let msg = compose_reminder(
            "B",
            DelayBreakdown {
                days: 0,
                hours: 1,
                minutes: 0,
            },
            Some(1),
        );
        assert_eq!(
            msg,
            "Reminder: B is due now! It is delayed by 1 hours and 0 minutes. There are 1 delayed tasks."
        );

        let msg = compose_reminder("C", DelayBreakdown::default(), None);
        assert_eq!(msg, "Reminder: C is due now! It is delayed by 0 minutes.");
    }

    #[test]
    fn poll_notifies_only_when_overdue() {
        let task = entry(1, "Report", "2024-01-01", "11:59", "PM").record;
        let mut reminder = Reminder::start(TaskId(1), at(1, 20, 0), TimeDelta::minutes(2));

        assert_eq!(reminder.poll(&task, || 0, at(1, 23, 0)), PollOutcome::Idle);
        assert_eq!(
            reminder.poll(&task, || 1, at(2, 0, 5)),
            PollOutcome::Notified(
                "Reminder: Report is due now! It is delayed by 6 minutes. There are 1 delayed tasks."
                    .to_string()
            )
        );
        assert_eq!(reminder.state(), ReminderState::Active);
    }

    #[test]
    fn completion_stops_permanently_without_notifying() {
        let mut task = entry(1, "Report", "2024-01-01", "9:00", "AM").record;
        let mut reminder = Reminder::start(TaskId(1), at(1, 8, 0), TimeDelta::minutes(2));

        task.completed = true;
        assert_eq!(reminder.poll(&task, || 9, at(3, 0, 0)), PollOutcome::Stopped);
        assert_eq!(reminder.state(), ReminderState::Stopped);

        // Re-opening the task does not revive this reminder.
        task.completed = false;
        assert_eq!(reminder.poll(&task, || 9, at(3, 0, 2)), PollOutcome::Idle);
        assert_eq!(reminder.poll(&task, || 9, at(4, 0, 0)), PollOutcome::Idle);
        assert_eq!(reminder.state(), ReminderState::Stopped);
        assert!(!reminder.is_due(at(5, 0, 0)));
    }

    #[test]
    fn advance_skips_missed_periods() {
        let mut reminder = Reminder::start(TaskId(1), at(1, 0, 0), TimeDelta::minutes(2));
        assert_eq!(reminder.next_poll(), at(1, 0, 2));
        reminder.advance(at(1, 0, 7), TimeDelta::minutes(2));
        assert_eq!(reminder.next_poll(), at(1, 0, 8));
        reminder.advance(at(1, 0, 5), TimeDelta::minutes(2));
        assert_eq!(reminder.next_poll(), at(1, 0, 8));
    }

    #[test]
    fn scheduler_polls_on_interval_and_counts_delayed_tasks() {
        let tasks = vec![
            entry(1, "Old", "2024-01-01", "9:00", "AM"),
            entry(2, "Older", "2023-12-31", "9:00", "AM"),
            entry(3, "Later", "2024-02-01", "9:00", "AM"),
        ];
        let mut scheduler = ReminderScheduler::new(Duration::from_secs(120));
        let start = at(1, 10, 0);
        for task in &tasks {
            scheduler.start(task.id, start);
        }
        let mut sink = MemorySink::default();

        let report = scheduler.tick(&tasks, at(1, 10, 1), &mut sink);
        assert_eq!(report, TickReport::default());
        assert!(sink.messages.is_empty());

        let report = scheduler.tick(&tasks, at(1, 10, 2), &mut sink);
        assert_eq!(report.polled, 3);
        assert_eq!(report.notified, 2);
        assert_eq!(
            sink.messages,
            vec![
                "Reminder: Old is due now! It is delayed by 1 hours and 2 minutes. There are 2 delayed tasks."
                    .to_string(),
                "Reminder: Older is due now! It is delayed by 1 days, 1 hours, and 2 minutes. There are 2 delayed tasks."
                    .to_string(),
            ]
        );

        // Same instant again: nothing is due until the next period.
        let report = scheduler.tick(&tasks, at(1, 10, 2), &mut sink);
        assert_eq!(report.polled, 0);
        assert_eq!(sink.messages.len(), 2);
    }

    #[test]
    fn scheduler_drops_reminder_after_completion() {
        let mut tasks = vec![entry(1, "Old", "2024-01-01", "9:00", "AM")];
        let mut scheduler = ReminderScheduler::new(Duration::from_secs(60));
        scheduler.start(TaskId(1), at(1, 10, 0));
        let mut sink = MemorySink::default();

        tasks[0].record.completed = true;
        let report = scheduler.tick(&tasks, at(1, 10, 1), &mut sink);
        assert_eq!(report.stopped, 1);
        assert_eq!(scheduler.state(TaskId(1)), None);
        assert!(scheduler.is_empty());

        tasks[0].record.completed = false;
        for minute in 2..10 {
            scheduler.tick(&tasks, at(1, 10, minute), &mut sink);
        }
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn cancelled_reminder_never_fires() {
        let tasks = vec![entry(1, "Old", "2024-01-01", "9:00", "AM")];
        let mut scheduler = ReminderScheduler::new(Duration::from_secs(60));
        scheduler.start(TaskId(1), at(1, 10, 0));
        assert!(scheduler.cancel(TaskId(1)));
        assert!(!scheduler.cancel(TaskId(1)));

        let mut sink = MemorySink::default();
        for minute in 1..30 {
            scheduler.tick(&tasks, at(1, 10, minute), &mut sink);
        }
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn orphaned_reminder_is_released() {
        let mut scheduler = ReminderScheduler::new(Duration::from_secs(60));
        scheduler.start(TaskId(7), at(1, 10, 0));
        let mut sink = MemorySink::default();
        let report = scheduler.tick(&[], at(1, 10, 1), &mut sink);
        assert_eq!(report.orphaned, 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let scheduler = ReminderScheduler::new(Duration::ZERO);
        assert_eq!(scheduler.interval(), TimeDelta::minutes(2));
    }

    #[test]
    fn sweep_skips_completed_and_pending_tasks() {
        let mut done = entry(2, "Done", "2024-01-01", "9:00", "AM").record;
        done.completed = true;
        let tasks = vec![
            entry(1, "Late", "2024-01-01", "9:00", "AM").record,
            done,
            entry(3, "Soon", "2024-01-09", "9:00", "AM").record,
        ];
        let messages = sweep_overdue(&tasks, at(1, 9, 30));
        assert_eq!(
            messages,
            vec!["Reminder: Late is due now! It is delayed by 30 minutes.".to_string()]
        );
    }
}
