use std::path::{Path, PathBuf};

use racesync_core::export::suggested_export_file_name;
use racesync_core::package::ExportType;
use racesync_core::services::SyncService;

use crate::commands::common::write_json;
use crate::error::CliError;

pub async fn run_export(
    service: &SyncService,
    races: &[i64],
    output: Option<&Path>,
) -> Result<Option<PathBuf>, CliError> {
    let package = match races {
        [race] => service.export_one(*race).await?,
        _ => service.export_many(races).await?,
    };

    write_json(&package, output, || {
        suggested_export_file_name(ExportType::FullRaceData, races, package.export_date)
    })
}

pub async fn run_export_legacy(
    service: &SyncService,
    race: i64,
    output: Option<&Path>,
) -> Result<Option<PathBuf>, CliError> {
    let package = service.export_legacy_config(race).await?;

    write_json(&package, output, || {
        suggested_export_file_name(ExportType::RaceConfig, &[race], package.export_date)
    })
}

pub async fn run_export_checkpoint(
    service: &SyncService,
    race: i64,
    checkpoint: u32,
    output: Option<&Path>,
) -> Result<Option<PathBuf>, CliError> {
    let package = service.export_checkpoint_results(race, checkpoint).await?;

    write_json(&package, output, || {
        suggested_export_file_name(ExportType::CheckpointResults, &[race], package.export_date)
    })
}
