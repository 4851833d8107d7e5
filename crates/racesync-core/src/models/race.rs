//! Race model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Collection, Entity};

/// A race as configured on the station that created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    /// Primary identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Race day
    pub date: NaiveDate,
    /// Start time of day (`HH:MM`)
    pub start_time: String,
    /// Lowest bib number in use
    pub min_runner: u32,
    /// Highest bib number in use
    pub max_runner: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last local modification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this station does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Race {
    /// Create a race with default start time and an empty bib range
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            date,
            start_time: "08:00".to_string(),
            min_runner: 1,
            max_runner: 1,
            created_at: Utc::now(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Number of bibs in the configured range
    #[must_use]
    pub const fn runner_capacity(&self) -> u32 {
        self.max_runner.saturating_sub(self.min_runner) + 1
    }
}

impl Entity for Race {
    const COLLECTION: Collection = Collection::Races;

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn race_id(&self) -> i64 {
        self.id
    }
}
