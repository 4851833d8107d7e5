//! Checkpoint-results import
//!
//! A checkpoint-results package carries one checkpoint's runner snapshot.
//! Import either rejects the package outright or replaces the stored
//! snapshot for that (race, checkpoint); there is no merge and no partial
//! state.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::checksum;
use crate::db::{Database, ImportedResultRepository, SqliteImportedResultRepository};
use crate::error::{Error, Result};
use crate::models::ImportedCheckpointResult;
use crate::package::ExportType;
use crate::schema::entities::CHECKPOINT_RESULTS_DATA;
use crate::util::{compact_text, normalize_identifier};

/// Snapshot written by a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointImportSummary {
    pub race_id: String,
    pub checkpoint_number: u32,
    pub total_runners: usize,
}

/// Non-failing import outcome for UI callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointImportReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_runners: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<CheckpointImportSummary>> for CheckpointImportReport {
    fn from(result: Result<CheckpointImportSummary>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                checkpoint_number: Some(summary.checkpoint_number),
                total_runners: Some(summary.total_runners),
                error: None,
            },
            Err(error) => Self {
                success: false,
                checkpoint_number: None,
                total_runners: None,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Import a checkpoint-results package for the station's active race
///
/// Rejects, in order: a malformed envelope, a checksum that does not match
/// `data`, and a package for a race other than `active_race_id`.
pub fn import_checkpoint_results(
    db: &mut Database,
    raw: &Value,
    active_race_id: &str,
) -> Result<CheckpointImportSummary> {
    let incoming = match parse(raw, active_race_id) {
        Ok(incoming) => incoming,
        Err(error) => {
            warn!(%error, "Rejected checkpoint results");
            return Err(error);
        }
    };

    let summary = CheckpointImportSummary {
        race_id: incoming.race_id.clone(),
        checkpoint_number: incoming.checkpoint_number,
        total_runners: incoming.runners.len(),
    };
    db.transaction(|conn| SqliteImportedResultRepository::new(conn).replace(&incoming))
        .map_err(|error| Error::Transaction(error.to_string()))?;

    info!(
        race_id = %summary.race_id,
        checkpoint_number = summary.checkpoint_number,
        runners = summary.total_runners,
        "Imported checkpoint results"
    );
    Ok(summary)
}

/// Stored snapshots for a race, ordered by checkpoint number
pub fn list_imported_checkpoint_results(
    db: &Database,
    race_id: &str,
) -> Result<Vec<ImportedCheckpointResult>> {
    SqliteImportedResultRepository::new(db.connection()).list_for_race(race_id.trim())
}

fn parse(raw: &Value, active_race_id: &str) -> Result<ImportedCheckpointResult> {
    let export_type = raw.get("exportType").and_then(Value::as_str);
    if export_type != Some(ExportType::CheckpointResults.as_str()) {
        let found = export_type.map_or_else(|| "nothing".to_string(), compact_text);
        return Err(Error::MalformedPackage(format!(
            "expected a {} package, found {found}",
            ExportType::CheckpointResults
        )));
    }

    let data = raw
        .get("data")
        .ok_or_else(|| Error::MalformedPackage("missing data".into()))?;
    if let Some(error) = CHECKPOINT_RESULTS_DATA.check(data).into_iter().next() {
        return Err(Error::MalformedPackage(format!("data.{error}")));
    }

    if let Some(declared) = raw.get("checksum").and_then(Value::as_str) {
        let actual = checksum::fingerprint_value(data);
        if !actual.eq_ignore_ascii_case(declared) {
            return Err(Error::ChecksumMismatch {
                expected: declared.to_string(),
                actual,
            });
        }
    }

    let race_id = normalize_identifier(&data["raceId"])
        .ok_or_else(|| Error::MalformedPackage("data.raceId is not an identifier".into()))?;
    let active = active_race_id.trim();
    if race_id != active {
        return Err(Error::RaceIdentityMismatch {
            package: race_id,
            active: active.to_string(),
        });
    }

    let checkpoint_number = data["checkpointNumber"]
        .as_u64()
        .and_then(|number| u32::try_from(number).ok())
        .ok_or_else(|| Error::MalformedPackage("data.checkpointNumber is out of range".into()))?;
    let runners = data["runners"].as_array().cloned().unwrap_or_default();

    Ok(ImportedCheckpointResult {
        race_id,
        checkpoint_number,
        runners,
        imported_at: Utc::now(),
    })
}
