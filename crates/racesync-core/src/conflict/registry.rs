//! Declarative conflict descriptors

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::models::Collection;

/// How conflicts in one collection are detected and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDescriptor {
    pub collection: Collection,
    /// Field shown to the operator when the two sides differ
    pub comparison_field: &'static str,
    /// Fields tried in order when ordering the two sides in time
    pub timestamp_fields: &'static [&'static str],
}

impl ConflictDescriptor {
    /// First present, parseable timestamp on a record
    pub fn timestamp_of(&self, record: &Value) -> Option<DateTime<Utc>> {
        self.timestamp_fields
            .iter()
            .find_map(|field| record.get(*field).and_then(parse_timestamp))
    }
}

const STANDARD: [ConflictDescriptor; 5] = [
    ConflictDescriptor {
        collection: Collection::Races,
        comparison_field: "date",
        timestamp_fields: &["updatedAt", "createdAt", "date"],
    },
    ConflictDescriptor {
        collection: Collection::Runners,
        comparison_field: "status",
        timestamp_fields: &["updatedAt"],
    },
    ConflictDescriptor {
        collection: Collection::Checkpoints,
        comparison_field: "name",
        timestamp_fields: &["updatedAt"],
    },
    ConflictDescriptor {
        collection: Collection::CheckpointRunners,
        comparison_field: "status",
        timestamp_fields: &["updatedAt", "timestamp"],
    },
    ConflictDescriptor {
        collection: Collection::BaseStationRunners,
        comparison_field: "status",
        timestamp_fields: &["updatedAt", "timestamp"],
    },
];

/// Set of collections checked for conflicts on import
///
/// Collections without a descriptor are applied without a conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRegistry {
    descriptors: Vec<ConflictDescriptor>,
}

impl ConflictRegistry {
    /// Races, runners, checkpoints and both runner-status tables
    #[must_use]
    pub fn standard() -> Self {
        Self {
            descriptors: STANDARD.to_vec(),
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Add or replace the descriptor for a collection
    pub fn register(&mut self, descriptor: ConflictDescriptor) {
        self.descriptors
            .retain(|existing| existing.collection != descriptor.collection);
        self.descriptors.push(descriptor);
    }

    pub fn descriptors(&self) -> &[ConflictDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, collection: Collection) -> Option<&ConflictDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.collection == collection)
    }
}

impl Default for ConflictRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// RFC 3339 string, `YYYY-MM-DD` date or unix milliseconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|time| time.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|time| time.and_utc())
            }),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
