//! CSV rollup functionality for archiving journalled events.
//!
//! Journalled weighings and administrations are appended to their CSV
//! archives atomically so the journal can stay small between rollups.

use crate::records::{AdministrationRow, WeighingRow, ADMINISTRATIONS_FILE, WEIGHINGS_FILE};
use crate::{journal, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// Roll up journalled events into the CSV archives and archive the journal
///
/// This function:
/// 1. Reads all events from the journal
/// 2. Appends them to the matching CSV archive (created with headers if
///    needed)
/// 3. Syncs the archives to disk
/// 4. Renames the journal to .processed
/// 5. Returns the number of events processed
///
/// # Safety
/// - Archives are fsynced before the journal is renamed
/// - The journal is renamed (not deleted) to allow manual recovery
/// - Processed journal files can be cleaned up with
///   [`cleanup_processed_journals`]
pub fn journal_to_csv_and_archive(journal_path: &Path, subject_dir: &Path) -> Result<usize> {
    let events = journal::read_events(journal_path)?;

    if events.is_empty() {
        tracing::info!("No events in journal to roll up");
        return Ok(0);
    }

    let mut weighings = Vec::new();
    let mut administrations = Vec::new();
    for event in &events {
        match *event {
            journal::JournalEvent::Weighing { at, grams } => weighings.push(WeighingRow {
                date_time: at.to_rfc3339(),
                weight: grams,
            }),
            journal::JournalEvent::WaterAdministration {
                at,
                millilitres,
                session,
            } => administrations.push(AdministrationRow {
                date_time: at.to_rfc3339(),
                water_administered: millilitres,
                session_id: session.map(|s| s.to_string()),
            }),
        }
    }

    append_rows(&subject_dir.join(WEIGHINGS_FILE), &weighings)?;
    append_rows(&subject_dir.join(ADMINISTRATIONS_FILE), &administrations)?;

    tracing::info!(
        "Wrote {} weighings and {} administrations to CSV",
        weighings.len(),
        administrations.len()
    );

    // Atomically archive the journal by renaming it
    let processed_path = journal_path.with_extension("jsonl.processed");
    std::fs::rename(journal_path, &processed_path)?;

    tracing::info!("Archived journal to {:?}", processed_path);

    Ok(events.len())
}

fn append_rows<R: Serialize>(csv_path: &Path, rows: &[R]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Write headers only when the archive is brand new
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;
    Ok(())
}

/// Clean up old processed journal files
///
/// This removes all .jsonl.processed files in the given directory.
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed journal: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journal files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{EventSink, JournalEvent, JsonlSink};
    use crate::records::{self, JOURNAL_FILE};
    use chrono::{TimeZone, Utc};
    use std::fs::File;
    use uuid::Uuid;

    fn weighing(day: u32, grams: f64) -> JournalEvent {
        JournalEvent::Weighing {
            at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            grams,
        }
    }

    #[test]
    fn test_rollup_creates_archives_and_archives_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join(JOURNAL_FILE);

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing(2, 17.0)).unwrap();
        sink.append(&weighing(3, 16.8)).unwrap();
        sink.append(&JournalEvent::WaterAdministration {
            at: Utc.with_ymd_and_hms(2024, 3, 2, 14, 0, 0).unwrap(),
            millilitres: 0.4,
            session: Some(Uuid::new_v4()),
        })
        .unwrap();

        let count = journal_to_csv_and_archive(&journal_path, temp_dir.path()).unwrap();
        assert_eq!(count, 3);

        let weighings = records::load_weighings(&temp_dir.path().join(WEIGHINGS_FILE)).unwrap();
        assert_eq!(weighings.len(), 2);
        let administrations =
            records::load_administrations(&temp_dir.path().join(ADMINISTRATIONS_FILE)).unwrap();
        assert_eq!(administrations.len(), 1);

        assert!(!journal_path.exists());
        assert!(journal_path.with_extension("jsonl.processed").exists());
    }

    #[test]
    fn test_rollup_appends_to_existing_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join(JOURNAL_FILE);

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing(2, 17.0)).unwrap();
        journal_to_csv_and_archive(&journal_path, temp_dir.path()).unwrap();

        let mut sink = JsonlSink::new(&journal_path);
        sink.append(&weighing(3, 16.8)).unwrap();
        journal_to_csv_and_archive(&journal_path, temp_dir.path()).unwrap();

        let weighings = records::load_weighings(&temp_dir.path().join(WEIGHINGS_FILE)).unwrap();
        assert_eq!(weighings.len(), 2);
    }

    #[test]
    fn test_empty_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal_path = temp_dir.path().join("empty.jsonl");

        File::create(&journal_path).unwrap();

        let count = journal_to_csv_and_archive(&journal_path, temp_dir.path()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cleanup_processed_journals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("e1.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("e2.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("keep.jsonl")).unwrap();

        let count = cleanup_processed_journals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);

        assert!(!temp_dir.path().join("e1.jsonl.processed").exists());
        assert!(!temp_dir.path().join("e2.jsonl.processed").exists());
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
