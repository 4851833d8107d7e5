use std::path::Path;

use racesync_core::checkpoint_results::CheckpointImportReport;
use racesync_core::services::SyncService;
use serde_json::Value;

use crate::commands::common::read_json;
use crate::error::CliError;

pub async fn run_import_checkpoint(
    service: &SyncService,
    file: &Path,
    active_race: &str,
) -> Result<CheckpointImportReport, CliError> {
    let raw: Value = read_json(file)?;
    let report = CheckpointImportReport::from(
        service.import_checkpoint_results(&raw, active_race).await,
    );

    match (&report.error, report.checkpoint_number, report.total_runners) {
        (Some(error), _, _) => Err(CliError::Rejected(error.clone())),
        (None, Some(checkpoint), Some(runners)) => {
            println!("Imported checkpoint {checkpoint} ({runners} runners)");
            Ok(report)
        }
        _ => Ok(report),
    }
}
