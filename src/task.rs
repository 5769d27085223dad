use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time_format::{self, ClockTime, Meridiem, TimeFormatError};

/// Runtime identity of a live task. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// A task materialized on the board, paired with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub id: TaskId,
    pub record: TaskRecord,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("deadline date must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),
    #[error("invalid deadline time: {0}")]
    InvalidTime(#[source] TimeFormatError),
    #[error("invalid AM/PM value: {0}")]
    InvalidMeridiem(#[source] TimeFormatError),
    #[error("no task at position {0}")]
    NotFound(usize),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(try_from = "StoredTask", into = "StoredTask")]
pub struct TaskRecord {
    pub text: String,
    pub due_date: NaiveDate,
    pub due_time: ClockTime,
    pub meridiem: Meridiem,
    pub completed: bool,
}

/// The persisted shape of a task.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    text: String,
    #[serde(default)]
    completed: bool,
    deadline_date: String,
    deadline_time: String,
    am_pm: String,
}

impl TryFrom<StoredTask> for TaskRecord {
    type Error = TaskError;

    fn try_from(stored: StoredTask) -> Result<Self, Self::Error> {
        if stored.text.trim().is_empty() {
            return Err(TaskError::EmptyText);
        }
        Ok(TaskRecord {
            text: stored.text,
            due_date: parse_date(&stored.deadline_date)?,
            due_time: stored.deadline_time.parse().map_err(TaskError::InvalidTime)?,
            meridiem: stored.am_pm.parse().map_err(TaskError::InvalidMeridiem)?,
            completed: stored.completed,
        })
    }
}

impl From<TaskRecord> for StoredTask {
    fn from(record: TaskRecord) -> Self {
        StoredTask {
            text: record.text,
            completed: record.completed,
            deadline_date: record.due_date.format("%Y-%m-%d").to_string(),
            deadline_time: record.due_time.to_string(),
            am_pm: record.meridiem.to_string(),
        }
    }
}

impl TaskRecord {
    /// Validates raw user input into a new, incomplete task.
    ///
    /// Every field is trimmed. The date must be exactly `YYYY-MM-DD` and
    /// name a real calendar day.
    pub fn from_input(text: &str, date: &str, time: &str, meridiem: &str) -> Result<Self, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }
        let due_date = parse_date(date.trim())?;
        let due_time = time.trim().parse().map_err(TaskError::InvalidTime)?;
        let meridiem = meridiem.trim().parse().map_err(TaskError::InvalidMeridiem)?;
        Ok(TaskRecord {
            text: text.to_string(),
            due_date,
            due_time,
            meridiem,
            completed: false,
        })
    }

    /// `text (Due: 2024-01-01 5:30 PM)`
    pub fn display_line(&self) -> String {
        format!(
            "{} (Due: {} {})",
            self.text,
            self.due_date.format("%Y-%m-%d"),
            time_format::format_display(self.due_time, self.meridiem)
        )
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, TaskError> {
    let bytes = date.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(TaskError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| TaskError::InvalidDate(date.to_string()))
}
