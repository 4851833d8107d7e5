//! Database layer for racesync

mod connection;
mod imported_results;
mod migrations;
mod repository;
mod settings_repository;

pub use connection::Database;
pub use imported_results::{ImportedResultRepository, SqliteImportedResultRepository};
pub use repository::{EntityRepository, SqliteEntityRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
