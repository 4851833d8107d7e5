//! Transactional package import
//!
//! Every import validates the package (checksum first), detects conflicts
//! against the local store, resolves them with a [`ResolutionPolicy`] and
//! then writes the surviving rows inside a single transaction.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::conflict::{self, Conflict, ConflictRegistry, ResolutionPolicy};
use crate::db::{Database, EntityRepository, SqliteEntityRepository};
use crate::error::{Error, Result};
use crate::models::{Checkpoint, CheckpointRunner, Collection, Entity, Race, Runner};
use crate::package::{CollectionCounts, ExportPackage, LegacyPackage, LegacyRaceConfig};
use crate::schema::{check_package, FieldError, ValidatedPackage};

/// Outcome of a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Rows written per collection
    pub applied: CollectionCounts,
    /// Conflicts found before resolution
    pub conflicts: usize,
    /// Conflicts resolved in favour of the stored record
    pub kept_existing: usize,
}

impl ImportSummary {
    #[must_use]
    pub fn total_applied(&self) -> usize {
        self.applied.values().sum()
    }
}

/// Validation and conflict detection without writing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    /// Incoming rows per collection
    pub summary: CollectionCounts,
    pub conflicts: Vec<Conflict>,
}

/// Non-failing form of [`Preview`] for operator review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    pub summary: CollectionCounts,
    pub conflicts: Vec<Conflict>,
}

impl From<Result<Preview>> for PreviewReport {
    fn from(result: Result<Preview>) -> Self {
        match result {
            Ok(preview) => Self {
                valid: true,
                errors: Vec::new(),
                summary: preview.summary,
                conflicts: preview.conflicts,
            },
            Err(error) => Self {
                valid: false,
                errors: error.field_errors(),
                summary: CollectionCounts::new(),
                conflicts: Vec::new(),
            },
        }
    }
}

/// Applies export packages to a local store
pub struct Importer<'a> {
    db: &'a mut Database,
    registry: ConflictRegistry,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            registry: ConflictRegistry::standard(),
        }
    }

    /// Use a custom set of conflict-checked collections
    #[must_use]
    pub fn with_registry(mut self, registry: ConflictRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Validate, resolve and atomically apply a full race-data package
    ///
    /// Nothing is written unless every row applies; a store failure rolls the
    /// whole import back and surfaces as [`Error::Transaction`].
    pub fn import_with_strategy(
        &mut self,
        raw: &Value,
        policy: &dyn ResolutionPolicy,
    ) -> Result<ImportSummary> {
        let package = current_package(raw)?;
        let repo = SqliteEntityRepository::new(self.db.connection());
        let conflicts = conflict::detect(&repo, &package.data, &self.registry)?;
        let resolution = conflict::resolve(&package.data, &conflicts, policy);

        let applied = self
            .db
            .transaction(|conn| {
                let repo = SqliteEntityRepository::new(conn);
                let mut applied = CollectionCounts::new();
                for collection in Collection::ALL {
                    let written = resolution.data.put_all(collection, &repo)?;
                    debug!(%collection, written, "Applied collection");
                    applied.insert(collection, written);
                }
                Ok(applied)
            })
            .map_err(|error| {
                warn!(%error, "Import rolled back");
                Error::Transaction(error.to_string())
            })?;

        let summary = ImportSummary {
            applied,
            conflicts: conflicts.len(),
            kept_existing: resolution.kept_existing,
        };
        info!(
            checksum = %package.checksum,
            applied = summary.total_applied(),
            conflicts = summary.conflicts,
            kept_existing = summary.kept_existing,
            "Imported package"
        );
        Ok(summary)
    }

    /// Run validation and conflict detection without opening a transaction
    pub fn preview_import(&self, raw: &Value) -> Result<Preview> {
        let package = current_package(raw)?;
        let repo = SqliteEntityRepository::new(self.db.connection());
        let conflicts = conflict::detect(&repo, &package.data, &self.registry)?;

        Ok(Preview {
            summary: package.data.counts(),
            conflicts,
        })
    }

    /// Apply a version 2 race-config package
    ///
    /// The race is matched by name and date rather than id. Checkpoints,
    /// runners and checkpoint runners are appended when their number is not
    /// already present for that race.
    pub fn import_legacy_format(&mut self, raw: &Value) -> Result<ImportSummary> {
        let package = match check_package(raw) {
            Ok(ValidatedPackage::Legacy(package)) => package,
            Ok(ValidatedPackage::Current(_)) => {
                return Err(Error::MalformedPackage(
                    "expected a race-config package with a raceConfig payload".into(),
                ))
            }
            Err(error) => {
                warn!(%error, "Rejected legacy package");
                return Err(error);
            }
        };
        let LegacyPackage {
            checksum,
            race_config,
            ..
        } = package;

        let applied = self
            .db
            .transaction(|conn| apply_legacy(&SqliteEntityRepository::new(conn), race_config))
            .map_err(|error| {
                warn!(%error, "Legacy import rolled back");
                Error::Transaction(error.to_string())
            })?;

        let summary = ImportSummary {
            applied,
            ..ImportSummary::default()
        };
        info!(%checksum, applied = summary.total_applied(), "Imported legacy race config");
        Ok(summary)
    }
}

fn current_package(raw: &Value) -> Result<ExportPackage> {
    match check_package(raw) {
        Ok(ValidatedPackage::Current(package)) => Ok(package),
        Ok(ValidatedPackage::Legacy(_)) => Err(Error::MalformedPackage(
            "race-config packages must be imported with the legacy importer".into(),
        )),
        Err(error) => {
            warn!(%error, "Rejected package");
            Err(error)
        }
    }
}

fn apply_legacy(repo: &impl EntityRepository, config: LegacyRaceConfig) -> Result<CollectionCounts> {
    let now = Utc::now();
    let existing = repo
        .list_all(Collection::Races)?
        .into_iter()
        .map(serde_json::from_value::<Race>)
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .find(|race| race.name == config.name && race.date == config.date);

    let race = match existing {
        Some(race) => Race {
            start_time: config.start_time,
            min_runner: config.min_runner,
            max_runner: config.max_runner,
            updated_at: Some(now),
            ..race
        },
        None => Race {
            id: repo.next_id(Collection::Races)?,
            name: config.name,
            date: config.date,
            start_time: config.start_time,
            min_runner: config.min_runner,
            max_runner: config.max_runner,
            created_at: config.created_at.unwrap_or(now),
            updated_at: None,
            extra: Map::new(),
        },
    };
    repo.put_entity(&race)?;
    let race_id = race.id;

    let mut applied = CollectionCounts::new();
    applied.insert(Collection::Races, 1);

    let known: HashSet<u32> = repo
        .list_entities_for_race::<Checkpoint>(race_id)?
        .iter()
        .map(|checkpoint| checkpoint.number)
        .collect();
    let mut next = repo.next_id(Collection::Checkpoints)?;
    let mut checkpoints = Vec::new();
    for legacy in config.checkpoints {
        if known.contains(&legacy.number) {
            continue;
        }
        let mut checkpoint = Checkpoint::new(next, race_id, legacy.number, legacy.name);
        checkpoint.description = legacy.description;
        checkpoints.push(checkpoint);
        next += 1;
    }
    applied.insert(Collection::Checkpoints, append(repo, &checkpoints)?);

    let known: HashSet<u32> = repo
        .list_entities_for_race::<Runner>(race_id)?
        .iter()
        .map(|runner| runner.number)
        .collect();
    let mut next = repo.next_id(Collection::Runners)?;
    let mut runners = Vec::new();
    for legacy in config.runners {
        if known.contains(&legacy.number) {
            continue;
        }
        let mut runner = Runner::new(next, race_id, legacy.number);
        runner.status = legacy.status;
        runner.first_name = legacy.first_name;
        runner.last_name = legacy.last_name;
        runners.push(runner);
        next += 1;
    }
    applied.insert(Collection::Runners, append(repo, &runners)?);

    let known: HashSet<String> = repo
        .list_entities_for_race::<CheckpointRunner>(race_id)?
        .iter()
        .map(Entity::key)
        .collect();
    let mut rows: Vec<CheckpointRunner> = Vec::new();
    for legacy in config.checkpoint_runners {
        let mut row = CheckpointRunner::new(race_id, legacy.checkpoint_number, legacy.number);
        if known.contains(&row.key()) || rows.iter().any(|seen| seen.key() == row.key()) {
            continue;
        }
        row.status = legacy.status;
        row.mark_off_time = legacy.mark_off_time;
        row.call_in_time = legacy.call_in_time;
        row.notes = legacy.notes;
        rows.push(row);
    }
    applied.insert(Collection::CheckpointRunners, append(repo, &rows)?);

    Ok(applied)
}

fn append<T: Entity>(repo: &impl EntityRepository, items: &[T]) -> Result<usize> {
    let records = items
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    repo.bulk_add(T::COLLECTION, &records)
}
