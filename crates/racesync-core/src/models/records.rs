//! Auxiliary race records: deletions, strapper calls, audit log, withdrawals and vet-outs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Collection, Entity};

/// Tombstone for an entity removed on the originating station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEntry {
    pub id: i64,
    pub race_id: i64,
    /// Collection name of the deleted entity
    pub entity_type: String,
    pub entity_id: String,
    pub deleted_at: DateTime<Utc>,
    /// Snapshot of the entity at deletion time
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress of a strapper (sweeper) call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrapperCallStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl StrapperCallStatus {
    pub const VALUES: [&'static str; 4] = ["pending", "in-progress", "completed", "cancelled"];
}

/// Request for strappers at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrapperCall {
    pub id: i64,
    pub race_id: i64,
    pub checkpoint_number: u32,
    pub status: StrapperCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Operator action recorded on a station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub race_id: i64,
    pub action: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Runner withdrawn from the race at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub id: i64,
    pub race_id: i64,
    pub runner_number: u32,
    pub checkpoint_number: u32,
    /// Time of day of the withdrawal (`HH:MM`)
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Runner removed from the race by a vet check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VetOutRecord {
    pub id: i64,
    pub race_id: i64,
    pub runner_number: u32,
    pub checkpoint_number: u32,
    /// Time of day of the vet-out (`HH:MM`)
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vet_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! id_keyed_entity {
    ($($ty:ty => $collection:expr),+ $(,)?) => {
        $(
            impl Entity for $ty {
                const COLLECTION: Collection = $collection;

                fn key(&self) -> String {
                    self.id.to_string()
                }

                fn race_id(&self) -> i64 {
                    self.race_id
                }
            }
        )+
    };
}

id_keyed_entity! {
    DeletedEntry => Collection::DeletedEntries,
    StrapperCall => Collection::StrapperCalls,
    AuditLogEntry => Collection::AuditLog,
    WithdrawalRecord => Collection::WithdrawalRecords,
    VetOutRecord => Collection::VetOutRecords,
}
