//! Package export
//!
//! The exporter reads race-scoped rows through an [`EntityRepository`] and
//! signs the assembled payload with [`checksum::fingerprint`].

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::checksum;
use crate::db::EntityRepository;
use crate::error::{Error, Result};
use crate::models::{Checkpoint, CheckpointRunner, Collection, DeviceIdentity, Race, Runner};
use crate::package::{
    CheckpointResultData, CheckpointResultMetadata, CheckpointResultPackage, EntityCollections,
    ExportPackage, ExportType, LegacyCheckpoint, LegacyCheckpointRunner, LegacyPackage,
    LegacyRaceConfig, LegacyRunner, PackageMetadata, CHECKPOINT_RESULTS_VERSION,
    LEGACY_PACKAGE_VERSION, PACKAGE_VERSION,
};

/// Builds signed export packages for one station
pub struct Exporter<'a, R: EntityRepository> {
    repo: &'a R,
    device: DeviceIdentity,
    package_version: String,
    checkpoint_package_version: String,
}

impl<'a, R: EntityRepository> Exporter<'a, R> {
    pub fn new(repo: &'a R, device: DeviceIdentity) -> Self {
        Self {
            repo,
            device,
            package_version: PACKAGE_VERSION.to_string(),
            checkpoint_package_version: CHECKPOINT_RESULTS_VERSION.to_string(),
        }
    }

    /// Override the versions written on full and checkpoint-results packages
    #[must_use]
    pub fn with_versions(
        mut self,
        package_version: impl Into<String>,
        checkpoint_package_version: impl Into<String>,
    ) -> Self {
        self.package_version = package_version.into();
        self.checkpoint_package_version = checkpoint_package_version.into();
        self
    }

    pub const fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Export every row belonging to one race
    pub fn export_one(&self, race_id: i64) -> Result<ExportPackage> {
        let data = self.collect_race(race_id)?;
        let package = self.sign(data)?;
        info!(race_id, checksum = %package.checksum, "Exported race");
        Ok(package)
    }

    /// Export several races into one package
    ///
    /// Collections are concatenated in the order the ids are given, then
    /// signed once over the merged payload.
    pub fn export_many(&self, race_ids: &[i64]) -> Result<ExportPackage> {
        if race_ids.is_empty() {
            return Err(Error::InvalidInput("no races selected for export".into()));
        }

        let mut data = EntityCollections::default();
        for race_id in race_ids {
            data.extend(self.export_one(*race_id)?.data);
        }

        let package = self.sign(data)?;
        info!(races = race_ids.len(), checksum = %package.checksum, "Exported races");
        Ok(package)
    }

    /// Export one checkpoint's runner rows
    ///
    /// Returns an empty runner list when the checkpoint has no rows.
    pub fn export_checkpoint_results(
        &self,
        race_id: i64,
        checkpoint_number: u32,
    ) -> Result<CheckpointResultPackage> {
        let runners: Vec<CheckpointRunner> = self
            .repo
            .list_entities_for_race::<CheckpointRunner>(race_id)?
            .into_iter()
            .filter(|runner| runner.checkpoint_number == checkpoint_number)
            .collect();

        let data = CheckpointResultData {
            race_id,
            checkpoint_number,
            runners,
        };
        let checksum = checksum::fingerprint(&data)?;
        let metadata = CheckpointResultMetadata {
            total_runners: data.runners.len(),
        };

        info!(
            race_id,
            checkpoint_number,
            runners = metadata.total_runners,
            "Exported checkpoint results"
        );
        Ok(CheckpointResultPackage {
            version: self.checkpoint_package_version.clone(),
            export_type: ExportType::CheckpointResults,
            export_date: Utc::now(),
            checksum,
            device_id: Some(self.device.to_string()),
            data,
            metadata,
        })
    }

    /// Export one race in the flat version 2 race-config shape
    pub fn export_legacy_config(&self, race_id: i64) -> Result<LegacyPackage> {
        let race = self.find_race(race_id)?;

        let checkpoints = self
            .repo
            .list_entities_for_race::<Checkpoint>(race_id)?
            .into_iter()
            .map(|checkpoint| LegacyCheckpoint {
                number: checkpoint.number,
                name: checkpoint.name,
                description: checkpoint.description,
            })
            .collect();
        let runners = self
            .repo
            .list_entities_for_race::<Runner>(race_id)?
            .into_iter()
            .map(|runner| LegacyRunner {
                number: runner.number,
                status: runner.status,
                first_name: runner.first_name,
                last_name: runner.last_name,
            })
            .collect();
        let checkpoint_runners = self
            .repo
            .list_entities_for_race::<CheckpointRunner>(race_id)?
            .into_iter()
            .map(|row| LegacyCheckpointRunner {
                checkpoint_number: row.checkpoint_number,
                number: row.number,
                status: row.status,
                mark_off_time: row.mark_off_time,
                call_in_time: row.call_in_time,
                notes: row.notes,
            })
            .collect();

        let race_config = LegacyRaceConfig {
            name: race.name,
            date: race.date,
            start_time: race.start_time,
            min_runner: race.min_runner,
            max_runner: race.max_runner,
            created_at: Some(race.created_at),
            checkpoints,
            runners,
            checkpoint_runners,
        };
        let checksum = checksum::fingerprint(&race_config)?;

        info!(race_id, "Exported legacy race config");
        Ok(LegacyPackage {
            version: LEGACY_PACKAGE_VERSION.to_string(),
            export_date: Utc::now(),
            checksum,
            device_id: Some(self.device.to_string()),
            export_type: ExportType::RaceConfig,
            race_config,
        })
    }

    fn find_race(&self, race_id: i64) -> Result<Race> {
        self.repo
            .get_entity::<Race>(&race_id.to_string())?
            .ok_or_else(|| Error::NotFound(format!("race {race_id}")))
    }

    fn collect_race(&self, race_id: i64) -> Result<EntityCollections> {
        let race = self.find_race(race_id)?;
        let mut data = EntityCollections {
            races: vec![race],
            ..EntityCollections::default()
        };

        for collection in Collection::ALL {
            if collection == Collection::Races {
                continue;
            }
            if !self.repo.has_collection(collection) {
                debug!(%collection, "Store has no such collection, exporting it empty");
                continue;
            }
            data.load_for_race(collection, race_id, self.repo)?;
        }

        debug!(race_id, counts = ?data.counts(), "Collected race rows");
        Ok(data)
    }

    fn sign(&self, data: EntityCollections) -> Result<ExportPackage> {
        let checksum = checksum::fingerprint(&data)?;
        Ok(ExportPackage {
            version: self.package_version.clone(),
            export_date: Utc::now(),
            checksum,
            device_id: Some(self.device.to_string()),
            export_type: ExportType::FullRaceData,
            metadata: PackageMetadata::from(&data),
            data,
        })
    }
}

/// File name for an export, e.g. `race-3-full-race-data-20240601T120000Z.json`
pub fn suggested_export_file_name(
    export_type: ExportType,
    race_ids: &[i64],
    at: DateTime<Utc>,
) -> String {
    let races = race_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("-");
    format!(
        "race-{races}-{export_type}-{}.json",
        at.format("%Y%m%dT%H%M%SZ")
    )
}
