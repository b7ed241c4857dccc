//! Append-only event journal.
//!
//! New weighings and water administrations logged between archive rollups
//! are appended to a JSONL (JSON Lines) file with file locking to ensure
//! safe concurrent access.

use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One journalled welfare event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    Weighing {
        at: DateTime<Utc>,
        grams: f64,
    },
    WaterAdministration {
        at: DateTime<Utc>,
        millilitres: f64,
        session: Option<Uuid>,
    },
}

impl JournalEvent {
    /// The instant this event occurred
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            JournalEvent::Weighing { at, .. } => *at,
            JournalEvent::WaterAdministration { at, .. } => *at,
        }
    }
}

/// Event sink trait for persisting journal events
pub trait EventSink {
    fn append(&mut self, event: &JournalEvent) -> Result<()>;
}

/// JSONL-based event sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EventSink for JsonlSink {
    fn append(&mut self, event: &JournalEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        // Open file for appending
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        // Write event as JSON line
        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended event at {} to journal", event.at());
        Ok(())
    }
}

/// Read all events from a journal file
pub fn read_events(path: &Path) -> Result<Vec<JournalEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<JournalEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse journal event at line {}: {}", line_num + 1, e);
                // Continue reading, don't fail completely
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} events from journal", events.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn weighing_event() -> JournalEvent {
        JournalEvent::Weighing {
            at: Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap(),
            grams: 21.4,
        }
    }

    #[test]
    fn test_append_and_read_single_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("events.jsonl");

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing_event()).unwrap();

        let events = read_events(&journal_path).unwrap();
        assert_eq!(events, vec![weighing_event()]);
    }

    #[test]
    fn test_append_mixed_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("events.jsonl");

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing_event()).unwrap();
        sink.append(&JournalEvent::WaterAdministration {
            at: Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap(),
            millilitres: 0.4,
            session: Some(Uuid::new_v4()),
        })
        .unwrap();

        let events = read_events(&journal_path).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], JournalEvent::WaterAdministration { .. }));
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("nonexistent.jsonl");

        let events = read_events(&journal_path).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("events.jsonl");

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing_event()).unwrap();

        use std::io::Write as _;
        let mut file = OpenOptions::new().append(true).open(&journal_path).unwrap();
        writeln!(file, "{{ not json }}").unwrap();

        sink.append(&weighing_event()).unwrap();

        let events = read_events(&journal_path).unwrap();
        assert_eq!(events.len(), 2);
    }
}
