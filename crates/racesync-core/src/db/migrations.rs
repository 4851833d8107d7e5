//! Database migrations

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;
    if version >= CURRENT_VERSION {
        return Ok(());
    }

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        -- Every entity collection shares one table; rows are JSON documents
        CREATE TABLE IF NOT EXISTS entities (
            collection TEXT NOT NULL,
            entity_key TEXT NOT NULL,
            race_id INTEGER NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (collection, entity_key)
        );
        CREATE INDEX IF NOT EXISTS idx_entities_race ON entities(collection, race_id);
        -- One snapshot per (race, checkpoint), replaced on every import
        CREATE TABLE IF NOT EXISTS imported_checkpoint_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id TEXT NOT NULL,
            checkpoint_number INTEGER NOT NULL,
            runners TEXT NOT NULL,
            imported_at TEXT NOT NULL,
            UNIQUE (race_id, checkpoint_number)
        );
        -- Settings table (local only)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )
    .inspect_err(|_| {
        conn.execute_batch("ROLLBACK;").ok();
    })?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}
