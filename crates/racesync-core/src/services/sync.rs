//! Serialized access to a station store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::checkpoint_results::{self, CheckpointImportSummary};
use crate::config::EngineConfig;
use crate::conflict::{ManualDecisions, ResolutionPolicy, Strategy};
use crate::db::{Database, EntityRepository, SqliteEntityRepository, SqliteSettingsRepository};
use crate::export::Exporter;
use crate::import::{ImportSummary, Importer, PreviewReport};
use crate::models::{DeviceIdentity, Entity, ImportedCheckpointResult};
use crate::package::{CheckpointResultPackage, ExportPackage, LegacyPackage};
use crate::Result;

/// Thread-safe handle to one station store.
///
/// Every operation takes the store lock for its whole duration, so imports
/// never interleave: a second import waits until the first has committed or
/// rolled back.
#[derive(Clone)]
pub struct SyncService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    device: DeviceIdentity,
    config: EngineConfig,
}

impl SyncService {
    /// Open (or create) a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::info!("Opened station store at {}", db_path.display());
        Self::from_database(db, Some(db_path), config)
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory(config: EngineConfig) -> Result<Self> {
        Self::from_database(Database::open_in_memory()?, None, config)
    }

    fn from_database(db: Database, db_path: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let settings = SqliteSettingsRepository::new(db.connection());
        let device = DeviceIdentity::load_or_create(&settings, config.device_label.as_deref())?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            device,
            config,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub const fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Insert or replace one entity.
    pub async fn put_entity<T: Entity>(&self, entity: &T) -> Result<()> {
        let db = self.db.lock().await;
        SqliteEntityRepository::new(db.connection()).put_entity(entity)
    }

    /// Get one entity by identity key.
    pub async fn get_entity<T: Entity>(&self, key: &str) -> Result<Option<T>> {
        let db = self.db.lock().await;
        SqliteEntityRepository::new(db.connection()).get_entity(key)
    }

    /// List one collection's entities for a race.
    pub async fn list_entities_for_race<T: Entity>(&self, race_id: i64) -> Result<Vec<T>> {
        let db = self.db.lock().await;
        SqliteEntityRepository::new(db.connection()).list_entities_for_race(race_id)
    }

    pub async fn export_one(&self, race_id: i64) -> Result<ExportPackage> {
        let db = self.db.lock().await;
        let repo = SqliteEntityRepository::new(db.connection());
        self.exporter(&repo).export_one(race_id)
    }

    pub async fn export_many(&self, race_ids: &[i64]) -> Result<ExportPackage> {
        let db = self.db.lock().await;
        let repo = SqliteEntityRepository::new(db.connection());
        self.exporter(&repo).export_many(race_ids)
    }

    pub async fn export_legacy_config(&self, race_id: i64) -> Result<LegacyPackage> {
        let db = self.db.lock().await;
        let repo = SqliteEntityRepository::new(db.connection());
        self.exporter(&repo).export_legacy_config(race_id)
    }

    pub async fn export_checkpoint_results(
        &self,
        race_id: i64,
        checkpoint_number: u32,
    ) -> Result<CheckpointResultPackage> {
        let db = self.db.lock().await;
        let repo = SqliteEntityRepository::new(db.connection());
        self.exporter(&repo)
            .export_checkpoint_results(race_id, checkpoint_number)
    }

    /// Import with a named strategy; `decisions` is only read by `manual`.
    pub async fn import_with_strategy(
        &self,
        raw: &Value,
        strategy: Strategy,
        decisions: ManualDecisions,
    ) -> Result<ImportSummary> {
        let policy = strategy.policy(decisions);
        self.import_with_policy(raw, policy.as_ref()).await
    }

    /// Import with the configured default strategy.
    pub async fn import_with_default_strategy(&self, raw: &Value) -> Result<ImportSummary> {
        self.import_with_strategy(raw, self.config.default_strategy, ManualDecisions::new())
            .await
    }

    pub async fn import_with_policy(
        &self,
        raw: &Value,
        policy: &dyn ResolutionPolicy,
    ) -> Result<ImportSummary> {
        let mut db = self.db.lock().await;
        Importer::new(&mut db).import_with_strategy(raw, policy)
    }

    /// Validate and detect conflicts without writing.
    pub async fn preview_import(&self, raw: &Value) -> PreviewReport {
        let mut db = self.db.lock().await;
        Importer::new(&mut db).preview_import(raw).into()
    }

    pub async fn import_legacy_format(&self, raw: &Value) -> Result<ImportSummary> {
        let mut db = self.db.lock().await;
        Importer::new(&mut db).import_legacy_format(raw)
    }

    pub async fn import_checkpoint_results(
        &self,
        raw: &Value,
        active_race_id: &str,
    ) -> Result<CheckpointImportSummary> {
        let mut db = self.db.lock().await;
        checkpoint_results::import_checkpoint_results(&mut db, raw, active_race_id)
    }

    pub async fn list_imported_checkpoint_results(
        &self,
        race_id: &str,
    ) -> Result<Vec<ImportedCheckpointResult>> {
        let db = self.db.lock().await;
        checkpoint_results::list_imported_checkpoint_results(&db, race_id)
    }

    fn exporter<'a>(&self, repo: &'a SqliteEntityRepository<'a>) -> Exporter<'a, SqliteEntityRepository<'a>> {
        Exporter::new(repo, self.device.clone()).with_versions(
            self.config.package_version.clone(),
            self.config.checkpoint_package_version.clone(),
        )
    }
}
