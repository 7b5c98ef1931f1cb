//! Per-run progress log.

use super::{EventLevel, ProgressEvent, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f32>,
    #[serde(default)]
    pub level: EventLevel,
}

impl LogEntry {
    pub fn from_event(event: ProgressEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: event.timestamp,
            stage: event.stage,
            message: event.message,
            percent: event.percent,
            level: event.level,
        }
    }
}

/// Append-only log of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ProgressEvent) -> &LogEntry {
        self.entries.push(LogEntry::from_event(event));
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level == EventLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level == EventLevel::Error)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}
