//! Station device identity

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::SettingsRepository;
use crate::error::Result;
use crate::util::normalize_text_option;

/// Settings key the identity is persisted under
pub const DEVICE_ID_SETTING: &str = "device_id";

/// Identity of the station that produced an export package.
///
/// Generated once on first use and persisted through the settings store;
/// every later load returns the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Wrap an existing identity string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh identity, optionally prefixed with a station label
    #[must_use]
    pub fn generate(label: Option<&str>) -> Self {
        let prefix = label
            .map(slugify)
            .and_then(|slug| normalize_text_option(Some(slug)))
            .unwrap_or_else(|| "device".to_string());
        Self(format!("{prefix}-{}", Uuid::now_v7()))
    }

    /// Load the persisted identity, generating and storing one on first use
    pub fn load_or_create(settings: &impl SettingsRepository, label: Option<&str>) -> Result<Self> {
        if let Some(stored) = normalize_text_option(settings.get(DEVICE_ID_SETTING)?) {
            return Ok(Self(stored));
        }

        let identity = Self::generate(label);
        settings.set(DEVICE_ID_SETTING, identity.as_str())?;
        tracing::info!("Generated device identity {}", identity);
        Ok(identity)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn slugify(label: &str) -> String {
    let slug = label
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    slug.trim_matches('-').to_string()
}
