//! The per-scope event log and history parsing.

use crate::event::DrawEvent;
use crate::reconcile::{self, AsEvent};
use thiserror::Error;

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced here and not yet seen in server history.
    Local,
    /// Received from another participant.
    Remote,
    /// Present in server-confirmed history.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub event: DrawEvent,
    pub origin: Origin,
}

impl AsEvent for LogEntry {
    fn as_event(&self) -> &DrawEvent {
        &self.event
    }
}

/// What happened to an incoming remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Appended,
    /// Same fingerprint as the last entry; dropped.
    Duplicate,
    Cleared,
    /// Transient; shown as an overlay, never stored.
    Preview,
    /// Text events from the wire are ignored.
    LocalOnly,
}

/// Ordered event log of one board.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &DrawEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    /// Local events the server has not confirmed yet.
    pub fn pending(&self) -> impl Iterator<Item = &DrawEvent> {
        self.entries
            .iter()
            .filter(|entry| entry.origin == Origin::Local)
            .map(|entry| &entry.event)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append an event produced on this client.
    pub fn append_local(&mut self, event: DrawEvent) {
        self.entries.push(LogEntry {
            event,
            origin: Origin::Local,
        });
    }

    /// Apply an event received from another participant.
    pub fn receive_remote(&mut self, event: DrawEvent) -> RemoteOutcome {
        if event.is_local_only() {
            return RemoteOutcome::LocalOnly;
        }
        if event.is_preview() {
            return RemoteOutcome::Preview;
        }
        if matches!(event, DrawEvent::Clear) {
            self.clear();
            return RemoteOutcome::Cleared;
        }

        let fingerprint = event.fingerprint();
        if self
            .entries
            .last()
            .is_some_and(|last| last.event.fingerprint() == fingerprint)
        {
            return RemoteOutcome::Duplicate;
        }

        self.entries.push(LogEntry {
            event,
            origin: Origin::Remote,
        });
        RemoteOutcome::Appended
    }

    /// Replace the log with `confirmed` followed by any entries it lacks.
    pub fn merge_history(&mut self, confirmed: Vec<DrawEvent>) {
        let (confirmed, extras) =
            reconcile::split_unconfirmed(confirmed, std::mem::take(&mut self.entries));
        self.entries = confirmed
            .into_iter()
            .map(|event| LogEntry {
                event,
                origin: Origin::Confirmed,
            })
            .chain(extras)
            .collect();
    }
}

/// Errors produced while loading history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("History must be a JSON array, got {0}")]
    NotAnArray(&'static str),
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Parse a history response body.
///
/// Entries that are not valid draw events are skipped with a warning; the rest
/// keep their order.
pub fn parse_history(json: &str) -> Result<Vec<DrawEvent>, HistoryError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => return Err(HistoryError::NotAnArray(json_kind(&other))),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, item)| match serde_json::from_value::<DrawEvent>(item) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("Skipping malformed history entry {}: {}", index, e);
                    None
                }
            },
        )
        .collect())
}
