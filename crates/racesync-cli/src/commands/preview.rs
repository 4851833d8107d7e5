use std::path::Path;

use racesync_core::import::PreviewReport;
use racesync_core::services::SyncService;
use serde_json::Value;

use crate::commands::common::read_json;
use crate::error::CliError;

pub async fn run_preview(
    service: &SyncService,
    file: &Path,
    as_json: bool,
) -> Result<PreviewReport, CliError> {
    let raw: Value = read_json(file)?;
    let report = service.preview_import(&raw).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_preview_lines(&report) {
            println!("{line}");
        }
    }

    if report.valid {
        Ok(report)
    } else {
        Err(CliError::Rejected(format!(
            "{} validation error(s)",
            report.errors.len()
        )))
    }
}

pub fn format_preview_lines(report: &PreviewReport) -> Vec<String> {
    if !report.valid {
        let mut lines = vec!["Package is invalid:".to_string()];
        lines.extend(report.errors.iter().map(|error| format!("  {error}")));
        return lines;
    }

    let mut lines = vec!["Package is valid".to_string()];
    lines.extend(
        report
            .summary
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(collection, count)| format!("  {collection}: {count} incoming")),
    );
    if report.conflicts.is_empty() {
        lines.push("No conflicts".to_string());
    } else {
        lines.push(format!("{} conflicts:", report.conflicts.len()));
        lines.extend(report.conflicts.iter().map(|conflict| {
            format!(
                "  {} {}: {} -> {}",
                conflict.id(),
                conflict.comparison_field,
                conflict.existing_value(),
                conflict.incoming_value()
            )
        }));
    }
    lines
}
