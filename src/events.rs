//! Event output for external integrations.
//!
//! Progression notifications are emitted as JSON lines to stdout or a
//! configured file, so a status bar or notifier can react to unlocks.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::engine::{Notification, ReplaceReason};
use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "questlog.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    /// Relative file paths are taken relative to `base` (the data dir).
    pub fn resolve_against(self, base: &Path) -> Self {
        match self {
            EventDestination::File(path) if path.is_relative() => {
                EventDestination::File(base.join(path))
            }
            other => other,
        }
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskAdded,
    TaskCompleted,
    BadgeUnlocked,
    LevelUp,
    ProgressImported,
    ProgressReset,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    /// Local wall-clock time of the session
    pub timestamp: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind, timestamp: NaiveDateTime) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp,
            data: None,
        }
    }

    /// Attach a serializable payload to the event.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Map an engine notification onto the event stream.
    pub fn from_notification(note: &Notification, timestamp: NaiveDateTime) -> Result<Self> {
        match note {
            Notification::BadgeUnlocked(unlock) => {
                Event::new(EventKind::BadgeUnlocked, timestamp).with_data(unlock)
            }
            Notification::LevelUp { new_level } => Event::new(EventKind::LevelUp, timestamp)
                .with_data(serde_json::json!({ "newLevel": new_level })),
            Notification::StateReplaced { reason } => {
                let kind = match reason {
                    ReplaceReason::Import => EventKind::ProgressImported,
                    ReplaceReason::Reset => EventKind::ProgressReset,
                };
                Ok(Event::new(kind, timestamp))
            }
        }
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    pub fn emit_notifications(
        &mut self,
        notes: &[Notification],
        timestamp: NaiveDateTime,
    ) -> Result<()> {
        for note in notes {
            self.emit(&Event::from_notification(note, timestamp)?)?;
        }
        Ok(())
    }
}
