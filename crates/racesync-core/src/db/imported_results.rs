//! Imported checkpoint result repository

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // SQLite counts are i64

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::ImportedCheckpointResult;

/// Trait for imported checkpoint result snapshots
pub trait ImportedResultRepository {
    /// Delete any snapshot for the result's (race, checkpoint), then insert it
    ///
    /// Callers run this inside a transaction so the pair is never observed
    /// half-applied.
    fn replace(&self, result: &ImportedCheckpointResult) -> Result<()>;

    /// Snapshot for one checkpoint
    fn get(&self, race_id: &str, checkpoint_number: u32)
        -> Result<Option<ImportedCheckpointResult>>;

    /// Every snapshot for a race, ordered by checkpoint number
    fn list_for_race(&self, race_id: &str) -> Result<Vec<ImportedCheckpointResult>>;

    /// Number of stored snapshots for one checkpoint (0 or 1)
    fn count(&self, race_id: &str, checkpoint_number: u32) -> Result<usize>;
}

/// `SQLite` implementation of `ImportedResultRepository`
pub struct SqliteImportedResultRepository<'a> {
    conn: &'a Connection,
}

type ResultRow = (String, u32, String, String);

impl<'a> SqliteImportedResultRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResultRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn parse_row(
        (race_id, checkpoint_number, runners, imported_at): ResultRow,
    ) -> Result<ImportedCheckpointResult> {
        let imported_at = DateTime::parse_from_rfc3339(&imported_at)
            .map_err(|error| {
                Error::InvalidInput(format!("stored import time {imported_at} is invalid: {error}"))
            })?
            .with_timezone(&Utc);

        Ok(ImportedCheckpointResult {
            race_id,
            checkpoint_number,
            runners: serde_json::from_str(&runners)?,
            imported_at,
        })
    }
}

impl ImportedResultRepository for SqliteImportedResultRepository<'_> {
    fn replace(&self, result: &ImportedCheckpointResult) -> Result<()> {
        self.conn.execute(
            "DELETE FROM imported_checkpoint_results WHERE race_id = ? AND checkpoint_number = ?",
            params![result.race_id, result.checkpoint_number],
        )?;
        self.conn.execute(
            "INSERT INTO imported_checkpoint_results (race_id, checkpoint_number, runners, imported_at)
             VALUES (?, ?, ?, ?)",
            params![
                result.race_id,
                result.checkpoint_number,
                serde_json::to_string(&result.runners)?,
                result.imported_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get(
        &self,
        race_id: &str,
        checkpoint_number: u32,
    ) -> Result<Option<ImportedCheckpointResult>> {
        let row = self
            .conn
            .query_row(
                "SELECT race_id, checkpoint_number, runners, imported_at
                 FROM imported_checkpoint_results
                 WHERE race_id = ? AND checkpoint_number = ?",
                params![race_id, checkpoint_number],
                Self::read_row,
            )
            .optional()?;

        row.map(Self::parse_row).transpose()
    }

    fn list_for_race(&self, race_id: &str) -> Result<Vec<ImportedCheckpointResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT race_id, checkpoint_number, runners, imported_at
             FROM imported_checkpoint_results
             WHERE race_id = ?
             ORDER BY checkpoint_number ASC",
        )?;

        let rows = stmt
            .query_map(params![race_id], Self::read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    fn count(&self, race_id: &str, checkpoint_number: u32) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM imported_checkpoint_results
             WHERE race_id = ? AND checkpoint_number = ?",
            params![race_id, checkpoint_number],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
