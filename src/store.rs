//! JSON file persistence for the task collection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::task::TaskRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write tasks to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/deadline-tracker/tasks.json`, falling back to the working
    /// directory when no data dir is known.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("deadline-tracker"))
            .unwrap_or_default()
            .join("tasks.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every well-formed task. Never fails: a missing or unreadable
    /// file and a document that is not a JSON array all yield no tasks,
    /// and malformed entries are skipped.
    pub fn load(&self) -> Vec<TaskRecord> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to read task file");
                return Vec::new();
            }
        };
        parse_tasks(&data)
    }

    /// Replaces the stored collection with `tasks`.
    pub fn save(&self, tasks: &[TaskRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(tasks)?;
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "tasks saved");
        Ok(())
    }
}

/// Decodes a stored document entry by entry.
pub fn parse_tasks(data: &str) -> Vec<TaskRecord> {
    let entries: Vec<serde_json::Value> = match serde_json::from_str(data) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(%err, "stored tasks are not a JSON array; starting empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(index, %err, "skipping malformed task");
                None
            }
        })
        .collect()
}
