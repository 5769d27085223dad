//! Where reminder messages end up.

use std::collections::VecDeque;
use std::io::{self, Write};

/// Fire-and-forget delivery of a user-visible message.
pub trait NotificationSink {
    fn notify(&mut self, message: &str);
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<String>,
}

impl NotificationSink for MemorySink {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// Prints each message on its own line, for the headless commands.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&mut self, message: &str) {
        tracing::info!(message, "notification");
        let mut out = io::stdout().lock();
        if let Err(err) = writeln!(out, "{message}") {
            tracing::warn!(%err, "failed to write notification");
        }
    }
}

/// Pending modal alerts for the terminal UI. The front-most one is shown
/// until the user dismisses it.
#[derive(Debug, Default)]
pub struct PopupQueue {
    pending: VecDeque<String>,
}

impl PopupQueue {
    pub fn current(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    pub fn dismiss(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl NotificationSink for PopupQueue {
    fn notify(&mut self, message: &str) {
        tracing::info!(message, "notification");
        self.pending.push_back(message.to_string());
    }
}
