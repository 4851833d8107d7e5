use std::env;
use std::path::{Path, PathBuf};

use racesync_core::config::EngineConfig;
use racesync_core::services::SyncService;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("RACESYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI data directory"))
        .join("racesync")
        .join("racesync.db")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI config directory"))
        .join("racesync")
        .join("config.json")
}

pub fn load_config(cli_config_path: Option<&Path>) -> Result<EngineConfig, CliError> {
    let path = cli_config_path.map_or_else(default_config_path, Path::to_path_buf);
    Ok(EngineConfig::load_from_path(&path)?)
}

pub async fn open_service(db_path: &Path, config: EngineConfig) -> Result<SyncService, CliError> {
    Ok(SyncService::open_path(db_path.to_path_buf(), config).await?)
}

/// Read and parse a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `value` as pretty JSON and return the file written, if any
///
/// An existing directory as `output` receives a file named by `file_name`;
/// no `output` prints to stdout.
pub fn write_json(
    value: &impl Serialize,
    output: Option<&Path>,
    file_name: impl FnOnce() -> String,
) -> Result<Option<PathBuf>, CliError> {
    let rendered = serde_json::to_string_pretty(value)?;

    let Some(output) = output else {
        println!("{rendered}");
        return Ok(None);
    };

    let path = if output.is_dir() {
        output.join(file_name())
    } else {
        output.to_path_buf()
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, rendered)?;
    println!("{}", path.display());
    Ok(Some(path))
}
