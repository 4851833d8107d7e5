use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use pretty_assertions::assert_eq;
use racesync_core::config::EngineConfig;
use racesync_core::conflict::Strategy;
use racesync_core::import::ImportSummary;
use racesync_core::models::{Checkpoint, CheckpointRunner, Collection, Race, Runner, RunnerStatus};
use racesync_core::services::SyncService;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use crate::cli::{Cli, Commands};
use crate::commands::checkpoint::run_import_checkpoint;
use crate::commands::common::{load_config, open_service, read_json, resolve_db_path};
use crate::commands::device::run_device_id;
use crate::commands::export::{run_export, run_export_checkpoint, run_export_legacy};
use crate::commands::import::{format_summary_lines, run_import, run_import_legacy};
use crate::commands::preview::{format_preview_lines, run_preview};
use crate::commands::verify::{run_verify, verify_package};
use crate::error::CliError;

async fn station(dir: &TempDir, name: &str) -> SyncService {
    open_service(&dir.path().join(name).join("racesync.db"), EngineConfig::default())
        .await
        .unwrap()
}

async fn seeded_station(dir: &TempDir, name: &str) -> SyncService {
    let service = station(dir, name).await;
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    service
        .put_entity(&Race::new(1, "Ridge Ultra", date))
        .await
        .unwrap();
    service.put_entity(&Runner::new(1, 1, 100)).await.unwrap();
    service.put_entity(&Runner::new(2, 1, 101)).await.unwrap();
    service
        .put_entity(&Checkpoint::new(1, 1, 2, "Saddle"))
        .await
        .unwrap();
    service
}

async fn export_to(service: &SyncService, dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    run_export(service, &[1], Some(dir)).await.unwrap().unwrap()
}

#[test]
fn resolve_db_path_prefers_explicit_path() {
    let explicit = PathBuf::from("/tmp/station.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn load_config_defaults_when_missing() {
    let dir = tempdir().unwrap();
    let config = load_config(Some(dir.path().join("missing.json").as_path())).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn cli_parses_repeated_races_and_strategy() {
    let cli = Cli::parse_from([
        "racesync", "export", "--race", "1", "--race", "2", "-o", "out",
    ]);
    let Commands::Export { races, output } = cli.command else {
        panic!("expected export command");
    };
    assert_eq!(races, vec![1, 2]);
    assert_eq!(output, Some(PathBuf::from("out")));

    let cli = Cli::parse_from(["racesync", "import", "pkg.json", "--strategy", "newer"]);
    let Commands::Import { strategy, .. } = cli.command else {
        panic!("expected import command");
    };
    assert_eq!(strategy, Some(Strategy::Newer));

    assert!(Cli::try_parse_from(["racesync", "import", "pkg.json", "--strategy", "latest"]).is_err());
}

#[tokio::test]
async fn export_writes_suggested_file_that_verifies() {
    let dir = tempdir().unwrap();
    let service = seeded_station(&dir, "cp").await;

    let path = export_to(&service, &dir.path().join("out")).await;

    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("race-1-full-race-data-"), "{name}");
    assert!(name.ends_with(".json"));
    let digest = run_verify(&path).unwrap();
    assert_eq!(digest.len(), 64);
}

#[tokio::test]
async fn verify_rejects_tampered_package() {
    let dir = tempdir().unwrap();
    let service = seeded_station(&dir, "cp").await;
    let path = export_to(&service, &dir.path().join("out")).await;

    let mut raw: Value = read_json(&path).unwrap();
    raw["data"]["runners"][0]["status"] = json!("dnf");

    let error = verify_package(&raw).unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(racesync_core::Error::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn import_into_empty_station_applies_everything() {
    let dir = tempdir().unwrap();
    let source = seeded_station(&dir, "cp").await;
    let path = export_to(&source, &dir.path().join("out")).await;

    let base = station(&dir, "base").await;
    let summary = run_import(&base, &path, None, None).await.unwrap();

    assert_eq!(summary.total_applied(), 4);
    assert_eq!(summary.conflicts, 0);
    let runners: Vec<Runner> = base.list_entities_for_race(1).await.unwrap();
    assert_eq!(runners.len(), 2);
}

#[tokio::test]
async fn manual_import_reads_decisions_file() {
    let dir = tempdir().unwrap();
    let source = seeded_station(&dir, "cp").await;
    let mut passed = Runner::new(2, 1, 101);
    passed.status = RunnerStatus::Passed;
    source.put_entity(&passed).await.unwrap();
    let path = export_to(&source, &dir.path().join("out")).await;

    let base = seeded_station(&dir, "base").await;
    let decisions = dir.path().join("decisions.json");
    std::fs::write(&decisions, r#"{"runners/2": "incoming"}"#).unwrap();

    let summary = run_import(&base, &path, Some(Strategy::Manual), Some(decisions.as_path()))
        .await
        .unwrap();

    assert_eq!(summary.conflicts, 4);
    assert_eq!(summary.kept_existing, 3);
    let stored: Runner = base.get_entity("2").await.unwrap().unwrap();
    assert_eq!(stored.status, RunnerStatus::Passed);
}

#[tokio::test]
async fn preview_lists_conflicts_and_rejects_invalid_packages() {
    let dir = tempdir().unwrap();
    let source = seeded_station(&dir, "cp").await;
    let path = export_to(&source, &dir.path().join("out")).await;
    let base = seeded_station(&dir, "base").await;

    let report = run_preview(&base, &path, false).await.unwrap();
    assert_eq!(report.conflicts.len(), 4);
    let lines = format_preview_lines(&report);
    assert_eq!(lines[0], "Package is valid");
    assert!(lines.iter().any(|line| line.starts_with("  runners/1 status")));

    let mut raw: Value = read_json(&path).unwrap();
    raw["checksum"] = json!("0".repeat(64));
    let tampered = dir.path().join("tampered.json");
    std::fs::write(&tampered, raw.to_string()).unwrap();

    let error = run_preview(&base, &tampered, true).await.unwrap_err();
    assert!(matches!(error, CliError::Rejected(_)));
}

#[tokio::test]
async fn checkpoint_results_import_checks_active_race() {
    let dir = tempdir().unwrap();
    let checkpoint = seeded_station(&dir, "cp").await;
    checkpoint
        .put_entity(&CheckpointRunner::new(1, 2, 100))
        .await
        .unwrap();
    let out = dir.path().join("results.json");
    run_export_checkpoint(&checkpoint, 1, 2, Some(out.as_path()))
        .await
        .unwrap();

    let base = station(&dir, "base").await;
    let error = run_import_checkpoint(&base, &out, "9").await.unwrap_err();
    assert!(matches!(error, CliError::Rejected(message) if message.contains("Race identity mismatch")));

    let report = run_import_checkpoint(&base, &out, "1").await.unwrap();
    assert!(report.success);
    assert_eq!(report.total_runners, Some(1));
    assert_eq!(base.list_imported_checkpoint_results("1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn legacy_export_imports_on_fresh_station() {
    let dir = tempdir().unwrap();
    let source = seeded_station(&dir, "cp").await;
    let out = dir.path().join("legacy.json");
    run_export_legacy(&source, 1, Some(out.as_path())).await.unwrap();

    let base = station(&dir, "base").await;
    let summary = run_import_legacy(&base, &out).await.unwrap();

    assert_eq!(summary.applied[&Collection::Runners], 2);
    assert_eq!(summary.applied[&Collection::Checkpoints], 1);
}

#[tokio::test]
async fn device_id_is_stable_for_a_store() {
    let dir = tempdir().unwrap();
    let first = run_device_id(&station(&dir, "cp").await);
    let second = run_device_id(&station(&dir, "cp").await);

    assert!(first.starts_with("device-"));
    assert_eq!(first, second);
}

#[test]
fn summary_lines_list_nonzero_collections() {
    let mut summary = ImportSummary {
        conflicts: 2,
        kept_existing: 1,
        ..ImportSummary::default()
    };
    summary.applied.insert(Collection::Runners, 3);
    summary.applied.insert(Collection::AuditLog, 0);

    assert_eq!(
        format_summary_lines(&summary),
        vec![
            "Imported 3 records (2 conflicts, 1 kept existing)".to_string(),
            "  runners: 3".to_string(),
        ]
    );
}
