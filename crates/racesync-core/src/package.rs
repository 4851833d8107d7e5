//! Export package wire types
//!
//! Every package is a JSON envelope whose `checksum` is the fingerprint of
//! its payload (`data`, or `raceConfig` for legacy packages).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum;
use crate::db::EntityRepository;
use crate::error::Result;
use crate::models::{
    AuditLogEntry, BaseStationRunner, Checkpoint, CheckpointRunner, Collection, DeletedEntry,
    Entity, Race, Runner, RunnerStatus, StrapperCall, VetOutRecord, WithdrawalRecord,
};

/// Version written on full race-data packages
pub const PACKAGE_VERSION: &str = "3.0.0";
/// Version of the single-race configuration format
pub const LEGACY_PACKAGE_VERSION: &str = "2.0.0";
/// Version written on checkpoint-results packages
pub const CHECKPOINT_RESULTS_VERSION: &str = "1.0";

/// Per-collection record counts
pub type CollectionCounts = BTreeMap<Collection, usize>;

/// Kind of export package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportType {
    FullRaceData,
    RaceConfig,
    CheckpointResults,
    IsolatedCheckpointResults,
    IsolatedBaseStationResults,
}

impl ExportType {
    /// Every accepted wire value
    pub const VALUES: [&'static str; 5] = [
        "full-race-data",
        "race-config",
        "checkpoint-results",
        "isolated-checkpoint-results",
        "isolated-base-station-results",
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullRaceData => "full-race-data",
            Self::RaceConfig => "race-config",
            Self::CheckpointResults => "checkpoint-results",
            Self::IsolatedCheckpointResults => "isolated-checkpoint-results",
            Self::IsolatedBaseStationResults => "isolated-base-station-results",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity rows carried by a package, one vector per collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCollections {
    #[serde(default)]
    pub races: Vec<Race>,
    #[serde(default)]
    pub runners: Vec<Runner>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub checkpoint_runners: Vec<CheckpointRunner>,
    #[serde(default)]
    pub base_station_runners: Vec<BaseStationRunner>,
    #[serde(default)]
    pub deleted_entries: Vec<DeletedEntry>,
    #[serde(default)]
    pub strapper_calls: Vec<StrapperCall>,
    #[serde(default)]
    pub audit_log: Vec<AuditLogEntry>,
    #[serde(default)]
    pub withdrawal_records: Vec<WithdrawalRecord>,
    #[serde(default)]
    pub vet_out_records: Vec<VetOutRecord>,
}

/// Expand `$body` once per collection with `$items` bound to that collection's rows.
macro_rules! dispatch {
    (@arms $collection:expr, $items:ident => $body:expr, $($borrow:tt)+) => {
        match $collection {
            Collection::Races => { let $items = $($borrow)+.races; $body }
            Collection::Runners => { let $items = $($borrow)+.runners; $body }
            Collection::Checkpoints => { let $items = $($borrow)+.checkpoints; $body }
            Collection::CheckpointRunners => { let $items = $($borrow)+.checkpoint_runners; $body }
            Collection::BaseStationRunners => { let $items = $($borrow)+.base_station_runners; $body }
            Collection::DeletedEntries => { let $items = $($borrow)+.deleted_entries; $body }
            Collection::StrapperCalls => { let $items = $($borrow)+.strapper_calls; $body }
            Collection::AuditLog => { let $items = $($borrow)+.audit_log; $body }
            Collection::WithdrawalRecords => { let $items = $($borrow)+.withdrawal_records; $body }
            Collection::VetOutRecords => { let $items = $($borrow)+.vet_out_records; $body }
        }
    };
    (mut $this:ident, $collection:expr, $items:ident => $body:expr) => {
        dispatch!(@arms $collection, $items => $body, &mut $this)
    };
    ($this:ident, $collection:expr, $items:ident => $body:expr) => {
        dispatch!(@arms $collection, $items => $body, &$this)
    };
}

impl EntityCollections {
    /// Number of rows in one collection
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        dispatch!(self, collection, items => items.len())
    }

    /// Whether every collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Collection::ALL.iter().all(|collection| self.len(*collection) == 0)
    }

    /// Row counts for every collection
    #[must_use]
    pub fn counts(&self) -> CollectionCounts {
        Collection::ALL
            .into_iter()
            .map(|collection| (collection, self.len(collection)))
            .collect()
    }

    /// Identity key and raw JSON of every row in one collection
    pub fn records(&self, collection: Collection) -> Result<Vec<(String, Value)>> {
        dispatch!(self, collection, items => raw_records(items))
    }

    /// Keep only the rows of `collection` whose key satisfies `keep`
    pub fn retain_keys(&mut self, collection: Collection, mut keep: impl FnMut(&str) -> bool) {
        dispatch!(mut self, collection, items => items.retain(|item| keep(&item.key())));
    }

    /// Append every collection of `other` onto this one
    pub fn extend(&mut self, other: Self) {
        self.races.extend(other.races);
        self.runners.extend(other.runners);
        self.checkpoints.extend(other.checkpoints);
        self.checkpoint_runners.extend(other.checkpoint_runners);
        self.base_station_runners.extend(other.base_station_runners);
        self.deleted_entries.extend(other.deleted_entries);
        self.strapper_calls.extend(other.strapper_calls);
        self.audit_log.extend(other.audit_log);
        self.withdrawal_records.extend(other.withdrawal_records);
        self.vet_out_records.extend(other.vet_out_records);
    }

    /// Upsert every row of one collection through `repo`
    pub fn put_all(&self, collection: Collection, repo: &impl EntityRepository) -> Result<usize> {
        dispatch!(self, collection, items => {
            for item in items {
                repo.put_entity(item)?;
            }
            Ok(items.len())
        })
    }

    /// Load one collection's rows for a race into this set
    pub fn load_for_race(
        &mut self,
        collection: Collection,
        race_id: i64,
        repo: &impl EntityRepository,
    ) -> Result<()> {
        dispatch!(mut self, collection, items => {
            *items = repo.list_entities_for_race(race_id)?;
            Ok(())
        })
    }
}

fn raw_records<T: Entity>(items: &[T]) -> Result<Vec<(String, Value)>> {
    items
        .iter()
        .map(|item| Ok((item.key(), serde_json::to_value(item)?)))
        .collect()
}

/// Record counts written alongside a package's data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageMetadata {
    pub total_races: usize,
    pub total_runners: usize,
    pub total_checkpoints: usize,
    pub total_checkpoint_runners: usize,
    pub total_base_station_runners: usize,
    pub total_deleted_entries: usize,
    pub total_strapper_calls: usize,
    pub total_audit_log_entries: usize,
    pub total_withdrawal_records: usize,
    pub total_vet_out_records: usize,
}

impl From<&EntityCollections> for PackageMetadata {
    fn from(data: &EntityCollections) -> Self {
        Self {
            total_races: data.races.len(),
            total_runners: data.runners.len(),
            total_checkpoints: data.checkpoints.len(),
            total_checkpoint_runners: data.checkpoint_runners.len(),
            total_base_station_runners: data.base_station_runners.len(),
            total_deleted_entries: data.deleted_entries.len(),
            total_strapper_calls: data.strapper_calls.len(),
            total_audit_log_entries: data.audit_log.len(),
            total_withdrawal_records: data.withdrawal_records.len(),
            total_vet_out_records: data.vet_out_records.len(),
        }
    }
}

/// Signed multi-collection export package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPackage {
    pub version: String,
    pub export_date: DateTime<Utc>,
    /// Fingerprint of `data`
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub export_type: ExportType,
    pub data: EntityCollections,
    #[serde(default)]
    pub metadata: PackageMetadata,
}

impl ExportPackage {
    /// Whether `checksum` still matches `data`
    pub fn is_intact(&self) -> bool {
        checksum::verify(&self.checksum, &self.data)
    }
}

/// Checkpoint entry in a legacy race configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCheckpoint {
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Roster entry in a legacy race configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRunner {
    pub number: u32,
    #[serde(default)]
    pub status: RunnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Checkpoint runner row in a legacy race configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCheckpointRunner {
    pub checkpoint_number: u32,
    pub number: u32,
    #[serde(default)]
    pub status: RunnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_off_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_in_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Single-race configuration with flat row lists and no identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRaceConfig {
    pub name: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub min_runner: u32,
    pub max_runner: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checkpoints: Vec<LegacyCheckpoint>,
    #[serde(default)]
    pub runners: Vec<LegacyRunner>,
    #[serde(default)]
    pub checkpoint_runners: Vec<LegacyCheckpointRunner>,
}

/// Version 2 race-config package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPackage {
    pub version: String,
    pub export_date: DateTime<Utc>,
    /// Fingerprint of `race_config`
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub export_type: ExportType,
    pub race_config: LegacyRaceConfig,
}

/// Payload of a checkpoint-results package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointResultData {
    pub race_id: i64,
    pub checkpoint_number: u32,
    pub runners: Vec<CheckpointRunner>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointResultMetadata {
    pub total_runners: usize,
}

/// One checkpoint's runner snapshot, imported with overwrite semantics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointResultPackage {
    pub version: String,
    pub export_type: ExportType,
    pub export_date: DateTime<Utc>,
    /// Fingerprint of `data`
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub data: CheckpointResultData,
    pub metadata: CheckpointResultMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> EntityCollections {
        let race = Race::new(1, "Ridge", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        EntityCollections {
            races: vec![race],
            runners: vec![Runner::new(1, 1, 100), Runner::new(2, 1, 101)],
            checkpoints: vec![Checkpoint::new(1, 1, 1, "Hut")],
            ..EntityCollections::default()
        }
    }

    #[test]
    fn counts_cover_every_collection() {
        let counts = sample().counts();
        assert_eq!(counts.len(), Collection::ALL.len());
        assert_eq!(counts[&Collection::Runners], 2);
        assert_eq!(counts[&Collection::VetOutRecords], 0);
    }

    #[test]
    fn retain_keys_filters_one_collection() {
        let mut data = sample();
        data.retain_keys(Collection::Runners, |key| key != "1");

        assert_eq!(data.runners.len(), 1);
        assert_eq!(data.runners[0].id, 2);
        assert_eq!(data.races.len(), 1);
    }

    #[test]
    fn records_expose_keys_and_raw_values() {
        let records = sample().records(Collection::Runners).unwrap();
        assert_eq!(records[0].0, "1");
        assert_eq!(records[1].1["number"], json!(101));
    }

    #[test]
    fn missing_collections_deserialize_empty() {
        let data: EntityCollections =
            serde_json::from_value(json!({"races": [], "auditLog": []})).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn metadata_mirrors_counts() {
        let metadata = PackageMetadata::from(&sample());
        assert_eq!(metadata.total_runners, 2);
        assert_eq!(metadata.total_checkpoints, 1);
        assert_eq!(
            serde_json::to_value(&metadata).unwrap()["totalAuditLogEntries"],
            json!(0)
        );
    }

    #[test]
    fn export_type_wire_values() {
        for value in ExportType::VALUES {
            let parsed: ExportType = serde_json::from_value(json!(value)).unwrap();
            assert_eq!(parsed.as_str(), value);
        }
    }
}
