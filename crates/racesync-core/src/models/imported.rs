//! Imported checkpoint result snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest checkpoint-results package imported for one (race, checkpoint).
///
/// At most one row exists per key; a new import replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedCheckpointResult {
    /// Normalized race identifier
    pub race_id: String,
    pub checkpoint_number: u32,
    /// Runner rows exactly as they arrived in the package
    pub runners: Vec<Value>,
    pub imported_at: DateTime<Utc>,
}
