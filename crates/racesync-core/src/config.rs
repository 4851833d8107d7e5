//! Engine configuration file

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conflict::Strategy;
use crate::error::{Error, Result};
use crate::package::{CHECKPOINT_RESULTS_VERSION, PACKAGE_VERSION};
use crate::util::normalize_text_option;

/// Station-level defaults for exports and imports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Strategy used when an import does not name one
    pub default_strategy: Strategy,
    /// Version written on full race-data packages
    pub package_version: String,
    /// Version written on checkpoint-results packages
    pub checkpoint_package_version: String,
    /// Prefix for a newly generated device identity
    pub device_label: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::default(),
            package_version: PACKAGE_VERSION.to_string(),
            checkpoint_package_version: CHECKPOINT_RESULTS_VERSION.to_string(),
            device_label: None,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    fn normalize(&mut self) {
        self.package_version = normalize_text_option(Some(self.package_version.clone()))
            .unwrap_or_else(|| PACKAGE_VERSION.to_string());
        self.checkpoint_package_version =
            normalize_text_option(Some(self.checkpoint_package_version.clone()))
                .unwrap_or_else(|| CHECKPOINT_RESULTS_VERSION.to_string());
        self.device_label = normalize_text_option(self.device_label.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load_from_path(&dir.path().join("config.json")).unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_strategy, Strategy::Skip);
        assert_eq!(config.package_version, "3.0.0");
    }

    #[test]
    fn partial_file_is_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"default_strategy": "newer", "package_version": "  ", "device_label": " Base Station "}"#,
        )
        .unwrap();

        let config = EngineConfig::load_from_path(&path).unwrap();

        assert_eq!(config.default_strategy, Strategy::Newer);
        assert_eq!(config.package_version, PACKAGE_VERSION);
        assert_eq!(config.checkpoint_package_version, CHECKPOINT_RESULTS_VERSION);
        assert_eq!(config.device_label.as_deref(), Some("Base Station"));
    }

    #[test]
    fn unknown_strategy_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_strategy": "latest"}"#).unwrap();

        let error = EngineConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = EngineConfig {
            default_strategy: Strategy::Older,
            device_label: Some(" cp-3 ".to_string()),
            ..EngineConfig::default()
        };

        config.save_to_path(&path).unwrap();
        let loaded = EngineConfig::load_from_path(&path).unwrap();

        assert_eq!(loaded.default_strategy, Strategy::Older);
        assert_eq!(loaded.device_label.as_deref(), Some("cp-3"));
    }
}
