//! Integration tests for the vivarium binary.
//!
//! These tests verify end-to-end behavior including:
//! - Record loading from a subject directory
//! - Ledger construction and CSV export
//! - Journal logging and rollup
//! - Restriction open/close workflow

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory with one subject
fn setup_subject() -> (TempDir, &'static str) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let subject_dir = temp_dir.path().join("CSK-082");
    fs::create_dir_all(&subject_dir).unwrap();

    fs::write(
        subject_dir.join("subject.toml"),
        r#"
nickname = "CSK-082"
birth_date = "2023-11-20"
sex = "M"
implant_weight = 2.0
reference_weight_pct = 0.80
zscore_weight_pct = 0.05
"#,
    )
    .unwrap();

    fs::write(
        subject_dir.join("weighings.csv"),
        "date_time,weight\n\
         2024-03-02T10:00:00Z,17.0\n\
         2024-03-05T10:00:00Z,16.8\n\
         2024-03-09T10:00:00Z,14.0\n",
    )
    .unwrap();

    fs::write(
        subject_dir.join("water_administrations.csv"),
        "date_time,water_administered,session_id\n\
         2024-03-02T14:00:00Z,0.3,8f2f5d24-9a9f-4c3e-8a2d-3f4b5c6d7e8f\n\
         2024-03-02T18:00:00Z,0.1,\n",
    )
    .unwrap();

    fs::write(
        subject_dir.join("restrictions.csv"),
        "start_time,end_time,reference_weight\n\
         2024-03-01T09:00:00Z,,20.0\n",
    )
    .unwrap();

    (temp_dir, "CSK-082")
}

/// Helper to get the path to the CLI binary
fn cli(data_dir: &Path, subject: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vivarium"));
    cmd.arg("--data-dir").arg(data_dir).arg("--subject").arg(subject);
    cmd
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("vivarium"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Water-restriction welfare tracking",
        ));
}

#[test]
fn test_ledger_reports_only_weighed_days() {
    let (temp_dir, subject) = setup_subject();

    cli(temp_dir.path(), subject)
        .arg("ledger")
        .arg("--start")
        .arg("2024-03-01")
        .arg("--end")
        .arg("2024-03-10")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 rows"))
        .stdout(predicate::str::contains("2024-03-05"));
}

#[test]
fn test_ledger_csv_export() {
    let (temp_dir, subject) = setup_subject();

    let output = cli(temp_dir.path(), subject)
        .arg("ledger")
        .arg("--start")
        .arg("2024-03-01")
        .arg("--end")
        .arg("2024-03-10")
        .arg("--csv")
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let mut lines = stdout.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("percentage_weight"));
    assert!(header.contains("given_water_reward"));
    // header plus one row per weighed day
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_status_reports_welfare_fields() {
    let (temp_dir, subject) = setup_subject();

    cli(temp_dir.path(), subject)
        .arg("status")
        .arg("--date")
        .arg("2024-03-05")
        .assert()
        .success()
        .stdout(predicate::str::contains("CSK-082"))
        .stdout(predicate::str::contains("restricted:      yes"))
        .stdout(predicate::str::contains("status:          nominal"));
}

#[test]
fn test_status_flags_critical_weight() {
    let (temp_dir, subject) = setup_subject();

    // 14.0 g is below the survival floor of 0.7 * (20 - 2) + 2 = 14.6 g
    cli(temp_dir.path(), subject)
        .arg("status")
        .arg("--date")
        .arg("2024-03-09")
        .assert()
        .success()
        .stdout(predicate::str::contains("status:          critical"));
}

#[test]
fn test_log_weighing_reaches_ledger() {
    let (temp_dir, subject) = setup_subject();

    cli(temp_dir.path(), subject)
        .arg("log-weighing")
        .arg("16.5")
        .arg("--at")
        .arg("2024-03-07T10:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Weighing logged"));

    // journal file exists
    assert!(temp_dir
        .path()
        .join(subject)
        .join("journal/events.jsonl")
        .exists());

    // the journalled weighing shows up as a new ledger row
    cli(temp_dir.path(), subject)
        .arg("ledger")
        .arg("--start")
        .arg("2024-03-01")
        .arg("--end")
        .arg("2024-03-10")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 rows"))
        .stdout(predicate::str::contains("2024-03-07"));
}

#[test]
fn test_rollup_archives_journal() {
    let (temp_dir, subject) = setup_subject();
    let subject_dir = temp_dir.path().join(subject);

    cli(temp_dir.path(), subject)
        .arg("log-water")
        .arg("0.25")
        .arg("--at")
        .arg("2024-03-06T15:00:00Z")
        .assert()
        .success();

    cli(temp_dir.path(), subject)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 events"));

    assert!(!subject_dir.join("journal/events.jsonl").exists());
    assert!(subject_dir.join("journal/events.jsonl.processed").exists());

    // the rolled-up administration is in the CSV archive now
    let archive = fs::read_to_string(subject_dir.join("water_administrations.csv")).unwrap();
    assert!(archive.contains("0.25"));
}

#[test]
fn test_restriction_workflow() {
    let (temp_dir, subject) = setup_subject();
    let subject_dir = temp_dir.path().join(subject);

    cli(temp_dir.path(), subject)
        .arg("end-restriction")
        .arg("--at")
        .arg("2024-03-10T09:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("Restriction closed"));

    cli(temp_dir.path(), subject)
        .arg("restrict")
        .arg("--start")
        .arg("2024-03-15T09:00:00Z")
        .arg("--reference-weight")
        .arg("19.5")
        .assert()
        .success()
        .stdout(predicate::str::contains("Restriction opened"));

    let archive = fs::read_to_string(subject_dir.join("restrictions.csv")).unwrap();
    assert!(archive.contains("2024-03-15"));
    assert!(archive.contains("19.5"));
}

#[test]
fn test_end_restriction_without_open_period_is_recoverable() {
    let (temp_dir, subject) = setup_subject();

    cli(temp_dir.path(), subject)
        .arg("end-restriction")
        .arg("--at")
        .arg("2024-03-10T09:00:00Z")
        .assert()
        .success();

    // a second close finds nothing open but still exits cleanly
    cli(temp_dir.path(), subject)
        .arg("end-restriction")
        .arg("--at")
        .arg("2024-03-11T09:00:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("No open restriction"));
}

#[test]
fn test_missing_subject_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    cli(temp_dir.path(), "NO-SUCH-SUBJECT")
        .arg("status")
        .assert()
        .failure();
}
