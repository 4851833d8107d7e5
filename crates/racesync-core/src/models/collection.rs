//! Entity collections and record identity

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::{integer_field, normalize_identifier};

/// Named entity collections carried by export packages and kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Races,
    Runners,
    Checkpoints,
    CheckpointRunners,
    BaseStationRunners,
    DeletedEntries,
    StrapperCalls,
    AuditLog,
    WithdrawalRecords,
    VetOutRecords,
}

impl Collection {
    /// Every collection, in apply order (races before the rows that reference them).
    pub const ALL: [Self; 10] = [
        Self::Races,
        Self::Runners,
        Self::Checkpoints,
        Self::CheckpointRunners,
        Self::BaseStationRunners,
        Self::DeletedEntries,
        Self::StrapperCalls,
        Self::AuditLog,
        Self::WithdrawalRecords,
        Self::VetOutRecords,
    ];

    /// Wire name used in package `data` and as the store collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Races => "races",
            Self::Runners => "runners",
            Self::Checkpoints => "checkpoints",
            Self::CheckpointRunners => "checkpointRunners",
            Self::BaseStationRunners => "baseStationRunners",
            Self::DeletedEntries => "deletedEntries",
            Self::StrapperCalls => "strapperCalls",
            Self::AuditLog => "auditLog",
            Self::WithdrawalRecords => "withdrawalRecords",
            Self::VetOutRecords => "vetOutRecords",
        }
    }

    /// Collections added after the first package versions. Hosts that predate
    /// them may not carry them at all.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            Self::BaseStationRunners
                | Self::DeletedEntries
                | Self::StrapperCalls
                | Self::AuditLog
                | Self::WithdrawalRecords
                | Self::VetOutRecords
        )
    }

    /// Whether rows are identified by `raceId:checkpointNumber:number` rather than `id`.
    #[must_use]
    pub const fn has_composite_key(self) -> bool {
        matches!(self, Self::CheckpointRunners | Self::BaseStationRunners)
    }

    /// Identity key of a raw record in this collection.
    pub fn key_of(self, record: &Value) -> Option<String> {
        if self.has_composite_key() {
            let race_id = integer_field(record, "raceId")?;
            let checkpoint = integer_field(record, "checkpointNumber")?;
            let number = integer_field(record, "number")?;
            Some(composite_key(race_id, checkpoint, number))
        } else {
            normalize_identifier(record.get("id")?)
        }
    }

    /// Race a raw record belongs to. Races belong to themselves.
    pub fn race_id_of(self, record: &Value) -> Option<i64> {
        match self {
            Self::Races => integer_field(record, "id"),
            _ => integer_field(record, "raceId"),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// Composite identity of checkpoint and base-station runner rows.
#[must_use]
pub fn composite_key(race_id: i64, checkpoint_number: i64, number: i64) -> String {
    format!("{race_id}:{checkpoint_number}:{number}")
}

/// A typed record stored in one of the entity collections.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Collection the entity lives in
    const COLLECTION: Collection;

    /// Identity key within the collection
    fn key(&self) -> String;

    /// Race the entity is scoped to
    fn race_id(&self) -> i64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>(), Ok(collection));
        }
        assert!("runner".parse::<Collection>().is_err());
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for collection in Collection::ALL {
            let serialized = serde_json::to_value(collection).unwrap();
            assert_eq!(serialized, json!(collection.as_str()));
        }
    }

    #[test]
    fn runner_rows_use_composite_key() {
        let row = json!({"raceId": 4, "checkpointNumber": 2, "number": 101, "status": "passed"});
        assert_eq!(
            Collection::CheckpointRunners.key_of(&row),
            Some("4:2:101".to_string())
        );
        assert_eq!(Collection::CheckpointRunners.race_id_of(&row), Some(4));
    }

    #[test]
    fn primary_key_accepts_string_ids() {
        let race = json!({"id": "9", "name": "Ridge Run"});
        assert_eq!(Collection::Races.key_of(&race), Some("9".to_string()));
        assert_eq!(Collection::Races.race_id_of(&race), Some(9));
        assert_eq!(Collection::Runners.key_of(&json!({"number": 3})), None);
    }
}
