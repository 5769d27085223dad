use std::time::Duration;

use chrono::NaiveDateTime;

use crate::notify::NotificationSink;
use crate::overdue;
use crate::reminder::{ReminderScheduler, ReminderState, TickReport};
use crate::task::{TaskEntry, TaskId, TaskRecord};

/// The live task collection. Every task on the board has its own reminder,
/// started when the task appears and released when it is deleted.
#[derive(Debug, Default)]
pub struct TaskBoard {
    entries: Vec<TaskEntry>,
    next_id: u64,
    reminders: ReminderScheduler,
    pub selected: usize,
}

impl TaskBoard {
    pub fn new(reminder_interval: Duration) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            reminders: ReminderScheduler::new(reminder_interval),
            selected: 0,
        }
    }

    /// Materializes loaded records, starting a reminder for each.
    pub fn from_records(
        records: Vec<TaskRecord>,
        reminder_interval: Duration,
        now: NaiveDateTime,
    ) -> Self {
        let mut board = Self::new(reminder_interval);
        for record in records {
            board.add(record, now);
        }
        board
    }

    pub fn add(&mut self, record: TaskRecord, now: NaiveDateTime) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        tracing::info!(task = id.0, text = %record.text, "task added");
        self.entries.push(TaskEntry { id, record });
        self.reminders.start(id, now);
        id
    }

    /// Flips completion and returns the new value.
    ///
    /// An active reminder notices completion on its own next tick. Re-opening
    /// a task whose reminder has already stopped starts a new one.
    pub fn toggle_completed(&mut self, id: TaskId, now: NaiveDateTime) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        entry.record.completed = !entry.record.completed;
        let completed = entry.record.completed;
        if !completed && !self.reminders.is_active(id) {
            self.reminders.start(id, now);
        }
        tracing::info!(task = id.0, completed, "task completion toggled");
        Some(completed)
    }

    /// Replaces text and deadline wholesale, keeping the completion flag.
    /// The old reminder is discarded and a fresh one started.
    pub fn edit(&mut self, id: TaskId, update: TaskRecord, now: NaiveDateTime) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.record = TaskRecord {
            completed: entry.record.completed,
            ..update
        };
        self.reminders.cancel(id);
        self.reminders.start(id, now);
        tracing::info!(task = id.0, "task edited");
        true
    }

    pub fn delete(&mut self, id: TaskId) -> Option<TaskRecord> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(index);
        self.reminders.cancel(id);
        if self.selected >= self.entries.len() {
            self.selected = self.entries.len().saturating_sub(1);
        }
        tracing::info!(task = id.0, "task deleted");
        Some(entry.record)
    }

    /// Runs every reminder that is due.
    pub fn tick(&mut self, now: NaiveDateTime, sink: &mut dyn NotificationSink) -> TickReport {
        self.reminders.tick(&self.entries, now, sink)
    }

    pub fn overdue_count(&self, now: NaiveDateTime) -> usize {
        overdue::count_overdue(self.records(), now)
    }

    pub fn reminder_state(&self, id: TaskId) -> Option<ReminderState> {
        self.reminders.state(id)
    }

    pub fn active_reminders(&self) -> usize {
        self.reminders.len()
    }

    pub fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.record)
    }

    /// Id of the task at a 0-based list position.
    pub fn id_at(&self, position: usize) -> Option<TaskId> {
        self.entries.get(position).map(|entry| entry.id)
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }

    /// Snapshot in list order, ready to persist.
    pub fn to_records(&self) -> Vec<TaskRecord> {
        self.records().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_id(&self) -> Option<TaskId> {
        self.id_at(self.selected)
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }
}
