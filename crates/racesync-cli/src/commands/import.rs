use std::path::Path;

use racesync_core::conflict::{ManualDecisions, Strategy};
use racesync_core::import::ImportSummary;
use racesync_core::services::SyncService;
use serde_json::Value;

use crate::commands::common::read_json;
use crate::error::CliError;

pub async fn run_import(
    service: &SyncService,
    file: &Path,
    strategy: Option<Strategy>,
    decisions: Option<&Path>,
) -> Result<ImportSummary, CliError> {
    let raw: Value = read_json(file)?;
    let strategy = strategy.unwrap_or(service.config().default_strategy);
    let decisions: ManualDecisions = match decisions {
        Some(path) => read_json(path)?,
        None => ManualDecisions::new(),
    };
    if strategy == Strategy::Manual && decisions.is_empty() {
        tracing::warn!("Manual strategy without decisions keeps every existing record");
    }

    let summary = service
        .import_with_strategy(&raw, strategy, decisions)
        .await?;
    for line in format_summary_lines(&summary) {
        println!("{line}");
    }
    Ok(summary)
}

pub async fn run_import_legacy(
    service: &SyncService,
    file: &Path,
) -> Result<ImportSummary, CliError> {
    let raw: Value = read_json(file)?;
    let summary = service.import_legacy_format(&raw).await?;
    for line in format_summary_lines(&summary) {
        println!("{line}");
    }
    Ok(summary)
}

pub fn format_summary_lines(summary: &ImportSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Imported {} records ({} conflicts, {} kept existing)",
        summary.total_applied(),
        summary.conflicts,
        summary.kept_existing
    )];
    lines.extend(
        summary
            .applied
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(collection, count)| format!("  {collection}: {count}")),
    );
    lines
}
