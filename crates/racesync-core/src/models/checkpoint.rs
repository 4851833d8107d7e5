//! Checkpoint model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Collection, Entity};

/// A checkpoint along the course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: i64,
    pub race_id: i64,
    /// Position along the course
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this station does not model, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(id: i64, race_id: i64, number: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            race_id,
            number,
            name: name.into(),
            description: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl Entity for Checkpoint {
    const COLLECTION: Collection = Collection::Checkpoints;

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn race_id(&self) -> i64 {
        self.race_id
    }
}
