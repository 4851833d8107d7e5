//! Conflict detection and resolution
//!
//! A conflict is an incoming record whose identity key already exists in the
//! local store. Only collections registered in a [`ConflictRegistry`] are
//! checked; every other incoming row is applied as-is.

mod policy;
mod registry;

pub use policy::{
    resolve, AcceptIncoming, Decision, Manual, ManualDecisions, Newer, Older, Resolution,
    ResolutionPolicy, Skip, Strategy,
};
pub use registry::{ConflictDescriptor, ConflictRegistry};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::db::EntityRepository;
use crate::error::Result;
use crate::models::Collection;
use crate::package::EntityCollections;

/// Incoming record colliding with a stored one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub collection: Collection,
    /// Identity key shared by both sides
    pub key: String,
    pub existing: Value,
    pub incoming: Value,
    pub comparison_field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_time: Option<DateTime<Utc>>,
}

impl Conflict {
    /// Identifier unique across collections, `"runners/12"`
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.collection, self.key)
    }

    /// Comparison field on the stored side
    pub fn existing_value(&self) -> &Value {
        self.existing.get(self.comparison_field).unwrap_or(&Value::Null)
    }

    /// Comparison field on the incoming side
    pub fn incoming_value(&self) -> &Value {
        self.incoming.get(self.comparison_field).unwrap_or(&Value::Null)
    }
}

/// Find every incoming record in a registered collection whose key is already stored
pub fn detect(
    repo: &impl EntityRepository,
    incoming: &EntityCollections,
    registry: &ConflictRegistry,
) -> Result<Vec<Conflict>> {
    let mut conflicts = Vec::new();

    for descriptor in registry.descriptors() {
        let collection = descriptor.collection;
        for (key, record) in incoming.records(collection)? {
            let Some(existing) = repo.get(collection, &key)? else {
                continue;
            };
            conflicts.push(Conflict {
                collection,
                existing_time: descriptor.timestamp_of(&existing),
                incoming_time: descriptor.timestamp_of(&record),
                key,
                existing,
                incoming: record,
                comparison_field: descriptor.comparison_field,
            });
        }
    }

    debug!(conflicts = conflicts.len(), "Detected import conflicts");
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteEntityRepository};
    use crate::models::{CheckpointRunner, Race, Runner, RunnerStatus, StrapperCall, StrapperCallStatus};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    fn store(db: &Database) -> SqliteEntityRepository<'_> {
        let repo = SqliteEntityRepository::new(db.connection());
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        repo.put_entity(&Race::new(1, "Ridge", date)).unwrap();
        repo.put_entity(&Runner::new(1, 1, 100)).unwrap();
        repo.put_entity(&CheckpointRunner::new(1, 2, 100)).unwrap();
        repo
    }

    #[test]
    fn detects_same_identity_in_registered_collections() {
        let db = Database::open_in_memory().unwrap();
        let repo = store(&db);

        let mut runner = Runner::new(1, 1, 100);
        runner.status = RunnerStatus::Passed;
        let incoming = EntityCollections {
            runners: vec![runner, Runner::new(2, 1, 101)],
            checkpoint_runners: vec![CheckpointRunner::new(1, 2, 100)],
            ..EntityCollections::default()
        };

        let conflicts = detect(&repo, &incoming, &ConflictRegistry::standard()).unwrap();

        let ids: Vec<_> = conflicts.iter().map(Conflict::id).collect();
        assert_eq!(ids, vec!["runners/1", "checkpointRunners/1:2:100"]);
        assert_eq!(conflicts[0].existing_value(), &json!("not-started"));
        assert_eq!(conflicts[0].incoming_value(), &json!("passed"));
    }

    #[test]
    fn unregistered_collections_never_conflict() {
        let db = Database::open_in_memory().unwrap();
        let repo = store(&db);
        let call = StrapperCall {
            id: 1,
            race_id: 1,
            checkpoint_number: 2,
            status: StrapperCallStatus::Pending,
            description: None,
            created_at: Utc::now(),
            updated_at: None,
            extra: Map::new(),
        };
        repo.put_entity(&call).unwrap();

        let incoming = EntityCollections {
            strapper_calls: vec![call],
            ..EntityCollections::default()
        };
        assert!(detect(&repo, &incoming, &ConflictRegistry::standard())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn empty_registry_detects_nothing() {
        let db = Database::open_in_memory().unwrap();
        let repo = store(&db);
        let incoming = EntityCollections {
            runners: vec![Runner::new(1, 1, 100)],
            ..EntityCollections::default()
        };

        assert!(detect(&repo, &incoming, &ConflictRegistry::empty())
            .unwrap()
            .is_empty());
    }
}
