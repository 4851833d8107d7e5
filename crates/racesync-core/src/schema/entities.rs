//! Schemas for each entity type and for the legacy race configuration

use serde_json::{Map, Value};

use super::rules::{EntitySchema, FieldKind, FieldRule};
use super::FieldError;
use crate::models::{Collection, RunnerStatus, StrapperCallStatus};

const RUNNER_STATUS: FieldKind = FieldKind::Enumeration(&RunnerStatus::VALUES);
const STRAPPER_STATUS: FieldKind = FieldKind::Enumeration(&StrapperCallStatus::VALUES);

pub static RACE: EntitySchema = EntitySchema {
    name: "race",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("name", FieldKind::Text),
        FieldRule::required("date", FieldKind::Date),
        FieldRule::required("startTime", FieldKind::TimeOfDay),
        FieldRule::required("minRunner", FieldKind::PositiveInteger),
        FieldRule::required("maxRunner", FieldKind::PositiveInteger),
        FieldRule::required("createdAt", FieldKind::Timestamp),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: Some(runner_range),
};

pub static RUNNER: EntitySchema = EntitySchema {
    name: "runner",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("number", FieldKind::PositiveInteger),
        FieldRule::required("status", RUNNER_STATUS),
        FieldRule::optional("firstName", FieldKind::FreeText),
        FieldRule::optional("lastName", FieldKind::FreeText),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static CHECKPOINT: EntitySchema = EntitySchema {
    name: "checkpoint",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("number", FieldKind::NonNegativeInteger),
        FieldRule::required("name", FieldKind::Text),
        FieldRule::optional("description", FieldKind::FreeText),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static CHECKPOINT_RUNNER: EntitySchema = EntitySchema {
    name: "checkpoint runner",
    fields: &[
        FieldRule::optional("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("number", FieldKind::PositiveInteger),
        FieldRule::required("status", RUNNER_STATUS),
        FieldRule::optional("markOffTime", FieldKind::TimeOfDay),
        FieldRule::optional("callInTime", FieldKind::TimeOfDay),
        FieldRule::optional("notes", FieldKind::FreeText),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static BASE_STATION_RUNNER: EntitySchema = EntitySchema {
    name: "base station runner",
    fields: &[
        FieldRule::optional("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("number", FieldKind::PositiveInteger),
        FieldRule::required("status", RUNNER_STATUS),
        FieldRule::optional("commonTimeLabel", FieldKind::TimeOfDay),
        FieldRule::optional("timestamp", FieldKind::Timestamp),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static DELETED_ENTRY: EntitySchema = EntitySchema {
    name: "deleted entry",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("entityType", FieldKind::Text),
        FieldRule::required("entityId", FieldKind::Text),
        FieldRule::required("deletedAt", FieldKind::Timestamp),
        FieldRule::optional("data", FieldKind::Any),
    ],
    refine: None,
};

pub static STRAPPER_CALL: EntitySchema = EntitySchema {
    name: "strapper call",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("status", STRAPPER_STATUS),
        FieldRule::optional("description", FieldKind::FreeText),
        FieldRule::required("createdAt", FieldKind::Timestamp),
        FieldRule::optional("updatedAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static AUDIT_LOG_ENTRY: EntitySchema = EntitySchema {
    name: "audit log entry",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("action", FieldKind::Text),
        FieldRule::required("entityType", FieldKind::Text),
        FieldRule::optional("entityId", FieldKind::Text),
        FieldRule::required("timestamp", FieldKind::Timestamp),
        FieldRule::optional("details", FieldKind::Any),
    ],
    refine: None,
};

pub static WITHDRAWAL_RECORD: EntitySchema = EntitySchema {
    name: "withdrawal record",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("runnerNumber", FieldKind::PositiveInteger),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("time", FieldKind::TimeOfDay),
        FieldRule::optional("reason", FieldKind::FreeText),
        FieldRule::required("createdAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static VET_OUT_RECORD: EntitySchema = EntitySchema {
    name: "vet-out record",
    fields: &[
        FieldRule::required("id", FieldKind::PositiveInteger),
        FieldRule::required("raceId", FieldKind::PositiveInteger),
        FieldRule::required("runnerNumber", FieldKind::PositiveInteger),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("time", FieldKind::TimeOfDay),
        FieldRule::optional("reason", FieldKind::FreeText),
        FieldRule::optional("vetName", FieldKind::FreeText),
        FieldRule::required("createdAt", FieldKind::Timestamp),
    ],
    refine: None,
};

pub static LEGACY_RACE_CONFIG: EntitySchema = EntitySchema {
    name: "race config",
    fields: &[
        FieldRule::required("name", FieldKind::Text),
        FieldRule::required("date", FieldKind::Date),
        FieldRule::required("startTime", FieldKind::TimeOfDay),
        FieldRule::required("minRunner", FieldKind::PositiveInteger),
        FieldRule::required("maxRunner", FieldKind::PositiveInteger),
        FieldRule::optional("createdAt", FieldKind::Timestamp),
        FieldRule::optional("checkpoints", FieldKind::Array),
        FieldRule::optional("runners", FieldKind::Array),
        FieldRule::optional("checkpointRunners", FieldKind::Array),
    ],
    refine: Some(runner_range),
};

pub static LEGACY_CHECKPOINT: EntitySchema = EntitySchema {
    name: "checkpoint",
    fields: &[
        FieldRule::required("number", FieldKind::NonNegativeInteger),
        FieldRule::required("name", FieldKind::Text),
        FieldRule::optional("description", FieldKind::FreeText),
    ],
    refine: None,
};

pub static LEGACY_RUNNER: EntitySchema = EntitySchema {
    name: "runner",
    fields: &[
        FieldRule::required("number", FieldKind::PositiveInteger),
        FieldRule::optional("status", RUNNER_STATUS),
        FieldRule::optional("firstName", FieldKind::FreeText),
        FieldRule::optional("lastName", FieldKind::FreeText),
    ],
    refine: None,
};

pub static LEGACY_CHECKPOINT_RUNNER: EntitySchema = EntitySchema {
    name: "checkpoint runner",
    fields: &[
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("number", FieldKind::PositiveInteger),
        FieldRule::optional("status", RUNNER_STATUS),
        FieldRule::optional("markOffTime", FieldKind::TimeOfDay),
        FieldRule::optional("callInTime", FieldKind::TimeOfDay),
        FieldRule::optional("notes", FieldKind::FreeText),
    ],
    refine: None,
};

/// Payload of a checkpoint-results package; runner rows are kept verbatim
pub static CHECKPOINT_RESULTS_DATA: EntitySchema = EntitySchema {
    name: "checkpoint results",
    fields: &[
        FieldRule::required("raceId", FieldKind::Identifier),
        FieldRule::required("checkpointNumber", FieldKind::NonNegativeInteger),
        FieldRule::required("runners", FieldKind::Array),
    ],
    refine: None,
};

/// Schema for the rows of one collection
#[must_use]
pub const fn schema_for(collection: Collection) -> &'static EntitySchema {
    match collection {
        Collection::Races => &RACE,
        Collection::Runners => &RUNNER,
        Collection::Checkpoints => &CHECKPOINT,
        Collection::CheckpointRunners => &CHECKPOINT_RUNNER,
        Collection::BaseStationRunners => &BASE_STATION_RUNNER,
        Collection::DeletedEntries => &DELETED_ENTRY,
        Collection::StrapperCalls => &STRAPPER_CALL,
        Collection::AuditLog => &AUDIT_LOG_ENTRY,
        Collection::WithdrawalRecords => &WITHDRAWAL_RECORD,
        Collection::VetOutRecords => &VET_OUT_RECORD,
    }
}

fn runner_range(object: &Map<String, Value>) -> Vec<FieldError> {
    let min = object.get("minRunner").and_then(Value::as_u64);
    let max = object.get("maxRunner").and_then(Value::as_u64);
    match (min, max) {
        (Some(min), Some(max)) if max < min => vec![FieldError::new(
            "maxRunner",
            format!("must not be below minRunner ({min})"),
        )],
        _ => Vec::new(),
    }
}
