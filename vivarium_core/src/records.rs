//! Record-file loading.
//!
//! A subject's records live in one directory: a `subject.toml` profile,
//! three CSV archives (weighings, water administrations, restriction
//! periods) and a JSONL journal of events logged since the last rollup.
//! This module reads them all and assembles a validated [`EventStore`].
//! Malformed CSV rows are skipped with a warning; structural violations in
//! the restriction list reject the load.

use crate::{
    journal, Error, EventStore, LabConfig, PeriodEnd, RestrictionPeriod, Result, Sex,
    SubjectProfile, Threshold, ThresholdStyle,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// File names inside a subject directory
pub const SUBJECT_FILE: &str = "subject.toml";
pub const WEIGHINGS_FILE: &str = "weighings.csv";
pub const ADMINISTRATIONS_FILE: &str = "water_administrations.csv";
pub const RESTRICTIONS_FILE: &str = "restrictions.csv";
pub const JOURNAL_FILE: &str = "journal/events.jsonl";

/// `subject.toml` contents. Lab-level percentages may be overridden per
/// subject.
#[derive(Debug, Deserialize)]
struct SubjectFile {
    nickname: String,
    birth_date: Option<String>,
    sex: String,
    implant_weight: Option<f64>,
    reference_weight_pct: Option<f64>,
    zscore_weight_pct: Option<f64>,
    utc_offset_minutes: Option<i32>,
}

/// CSV row format for weighing archives
#[derive(Debug, Serialize, Deserialize)]
pub struct WeighingRow {
    pub date_time: String,
    pub weight: f64,
}

/// CSV row format for water-administration archives
#[derive(Debug, Serialize, Deserialize)]
pub struct AdministrationRow {
    pub date_time: String,
    pub water_administered: f64,
    pub session_id: Option<String>,
}

/// CSV row format for restriction-period archives
#[derive(Debug, Serialize, Deserialize)]
pub struct RestrictionRow {
    pub start_time: String,
    pub end_time: Option<String>,
    pub reference_weight: Option<f64>,
}

/// A restriction period as read from file, before store validation
#[derive(Clone, Copy, Debug)]
pub struct RestrictionEntry {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub reference_weight: f64,
}

/// Parse a record timestamp: RFC 3339, or a bare `YYYY-MM-DD` anchored at
/// 12:00 UTC so it lands inside the intended calendar day
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(s.to_string()))?;
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| Error::InvalidDate(s.to_string()))?;
    Ok(Utc.from_utc_datetime(&noon))
}

fn parse_session_id(s: Option<&str>) -> Result<Option<Uuid>> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => Uuid::parse_str(id)
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid session id {id:?}: {e}"))),
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Load a subject profile, filling unset welfare percentages from the lab
/// configuration
pub fn load_profile(path: &Path, lab: &LabConfig) -> Result<SubjectProfile> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read subject file {path:?}: {e}"))
    })?;
    let file: SubjectFile = toml::from_str(&contents)?;

    let sex = Sex::parse(&file.sex)
        .ok_or_else(|| Error::Config(format!("unknown sex {:?}", file.sex)))?;
    let birth_date = file
        .birth_date
        .as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| Error::InvalidDate(s.to_string()))
        })
        .transpose()?;
    let offset_minutes = file.utc_offset_minutes.unwrap_or(0);
    let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
        Error::Config(format!("utc_offset_minutes {offset_minutes} out of range"))
    })?;

    Ok(SubjectProfile {
        nickname: file.nickname,
        birth_date,
        sex,
        implant_weight: file.implant_weight.unwrap_or(0.0),
        reference_weight_pct: file
            .reference_weight_pct
            .unwrap_or(lab.reference_weight_pct),
        zscore_weight_pct: file.zscore_weight_pct.unwrap_or(lab.zscore_weight_pct),
        utc_offset,
    })
}

// ============================================================================
// CSV archives
// ============================================================================

fn read_rows<R: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<R>> {
    if !path.exists() {
        tracing::debug!("No archive at {:?}", path);
        return Ok(Vec::new());
    }
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<R>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!("Failed to deserialize row in {:?}: {}", path, e);
                // Continue processing other rows
            }
        }
    }
    Ok(rows)
}

/// Load weighings from a CSV archive; malformed rows are skipped
pub fn load_weighings(path: &Path) -> Result<Vec<(DateTime<Utc>, f64)>> {
    let mut weighings = Vec::new();
    for row in read_rows::<WeighingRow>(path)? {
        match parse_timestamp(&row.date_time) {
            Ok(at) => weighings.push((at, row.weight)),
            Err(e) => tracing::warn!("Skipping weighing row in {:?}: {}", path, e),
        }
    }
    Ok(weighings)
}

/// Load water administrations from a CSV archive; malformed rows are
/// skipped
pub fn load_administrations(
    path: &Path,
) -> Result<Vec<(DateTime<Utc>, f64, Option<Uuid>)>> {
    let mut administrations = Vec::new();
    for row in read_rows::<AdministrationRow>(path)? {
        let parsed = parse_timestamp(&row.date_time)
            .and_then(|at| Ok((at, parse_session_id(row.session_id.as_deref())?)));
        match parsed {
            Ok((at, session)) => administrations.push((at, row.water_administered, session)),
            Err(e) => tracing::warn!("Skipping administration row in {:?}: {}", path, e),
        }
    }
    Ok(administrations)
}

/// Load restriction periods from a CSV archive, sorted by start.
/// Unlike event rows, a malformed restriction rejects the load: welfare
/// checks cannot run against a partial period list.
pub fn load_restrictions(path: &Path) -> Result<Vec<RestrictionEntry>> {
    let mut entries = Vec::new();
    for row in read_rows::<RestrictionRow>(path)? {
        let start = parse_timestamp(&row.start_time)?;
        let end = row.end_time.as_deref().map(parse_timestamp).transpose()?;
        entries.push(RestrictionEntry {
            start,
            end,
            reference_weight: row.reference_weight.unwrap_or(0.0),
        });
    }
    entries.sort_by_key(|e| e.start);
    Ok(entries)
}

/// Write the full restriction list back to its CSV archive
pub fn save_restrictions(path: &Path, periods: &[RestrictionPeriod]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for period in periods {
        writer.serialize(RestrictionRow {
            start_time: period.start.to_rfc3339(),
            end_time: match period.end {
                PeriodEnd::Open => None,
                PeriodEnd::Closed { at } => Some(at.to_rfc3339()),
            },
            reference_weight: (period.reference_weight > 0.0).then_some(period.reference_weight),
        })?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Assembly
// ============================================================================

/// Load everything in a subject directory into a validated event store.
///
/// Restrictions are inserted sorted; if the last period recorded a
/// reference weight it becomes the explicit override, and the display
/// thresholds (survival floor plus the configured target) are attached.
/// Journalled events not yet rolled up into the CSV archives are merged in.
pub fn load_subject(dir: &Path, lab: &LabConfig) -> Result<EventStore> {
    let profile = load_profile(&dir.join(SUBJECT_FILE), lab)?;
    tracing::debug!("Loaded profile for {}", profile.nickname);
    let mut store = EventStore::new(profile);

    // Restriction periods first: reference resolution depends on them
    let restrictions = load_restrictions(&dir.join(RESTRICTIONS_FILE))?;
    for entry in &restrictions {
        store.add_restriction_period(entry.start, entry.end, entry.reference_weight)?;
    }
    if let Some(last) = restrictions.last() {
        if last.reference_weight > 0.0 {
            store.set_reference_weight(last.start, last.reference_weight);
        }
    }

    for (at, grams) in load_weighings(&dir.join(WEIGHINGS_FILE))? {
        store.add_weighing(at, grams);
    }
    for (at, millilitres, session) in load_administrations(&dir.join(ADMINISTRATIONS_FILE))? {
        store.add_water_administration(at, millilitres, session);
    }

    // Merge journalled events not yet rolled up
    for event in journal::read_events(&dir.join(JOURNAL_FILE))? {
        match event {
            journal::JournalEvent::Weighing { at, grams } => store.add_weighing(at, grams),
            journal::JournalEvent::WaterAdministration {
                at,
                millilitres,
                session,
            } => store.add_water_administration(at, millilitres, session),
        }
    }

    store.add_threshold(Threshold {
        fraction: crate::classify::SURVIVAL_FLOOR_FRACTION,
        style: ThresholdStyle::Solid,
    });
    let target_pct = store.profile().reference_weight_pct;
    if target_pct > 0.0 {
        store.add_threshold(Threshold {
            fraction: target_pct,
            style: ThresholdStyle::Dashed,
        });
    }

    tracing::info!(
        "Loaded {}: {} weighings, {} administrations, {} restriction periods",
        store.profile().nickname,
        store.weighings().len(),
        store.administrations().len(),
        store.restrictions().len()
    );
    Ok(store)
}
