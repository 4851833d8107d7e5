//! racesync CLI - exchange race data between timing stations
//!
//! Every subcommand runs against the local station store; packages are read
//! from and written to JSON files.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::checkpoint::run_import_checkpoint;
use crate::commands::common::{load_config, open_service, resolve_db_path};
use crate::commands::device::run_device_id;
use crate::commands::export::{run_export, run_export_checkpoint, run_export_legacy};
use crate::commands::import::{run_import, run_import_legacy};
use crate::commands::preview::run_preview;
use crate::commands::verify::run_verify;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("racesync=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Verify { file } = &cli.command {
        run_verify(file)?;
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let db_path = resolve_db_path(cli.db_path);
    let service = open_service(&db_path, config).await?;

    match cli.command {
        Commands::Export { races, output } => {
            run_export(&service, &races, output.as_deref()).await?;
        }
        Commands::ExportLegacy { race, output } => {
            run_export_legacy(&service, race, output.as_deref()).await?;
        }
        Commands::ExportCheckpoint {
            race,
            checkpoint,
            output,
        } => {
            run_export_checkpoint(&service, race, checkpoint, output.as_deref()).await?;
        }
        Commands::Import {
            file,
            strategy,
            decisions,
        } => {
            run_import(&service, &file, strategy, decisions.as_deref()).await?;
        }
        Commands::Preview { file, json } => {
            run_preview(&service, &file, json).await?;
        }
        Commands::ImportLegacy { file } => {
            run_import_legacy(&service, &file).await?;
        }
        Commands::ImportCheckpoint { file, race } => {
            run_import_checkpoint(&service, &file, &race).await?;
        }
        Commands::DeviceId => {
            run_device_id(&service);
        }
        Commands::Verify { .. } => {}
    }

    Ok(())
}
