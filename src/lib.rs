//! Deadline tracking for a local task list: due-time evaluation, overdue
//! counting and per-task periodic reminders, with JSON persistence and a
//! terminal front end.

pub mod config;
pub mod deadline;
pub mod notify;
pub mod overdue;
pub mod reminder;
pub mod store;
pub mod task;
pub mod task_board;
pub mod time_format;
pub mod ui;
