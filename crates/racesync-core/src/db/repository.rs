//! Entity repository implementation

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // SQLite counts are i64

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Collection, Entity};

/// Trait for entity storage operations
///
/// Records are JSON documents addressed by collection and identity key (see
/// [`Collection::key_of`]). Implementations must be usable inside a
/// transaction so that an import can write several collections atomically.
pub trait EntityRepository {
    /// Get a record by identity key
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    /// Insert a record, replacing any existing record with the same key
    fn put(&self, collection: Collection, record: &Value) -> Result<()>;

    /// Delete a record; returns whether it existed
    fn delete(&self, collection: Collection, key: &str) -> Result<bool>;

    /// Insert new records; fails if any key already exists
    fn bulk_add(&self, collection: Collection, records: &[Value]) -> Result<usize>;

    /// List records scoped to a race, in insertion order
    fn list_for_race(&self, collection: Collection, race_id: i64) -> Result<Vec<Value>>;

    /// List every record in a collection, in insertion order
    fn list_all(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Number of records in a collection
    fn count(&self, collection: Collection) -> Result<usize>;

    /// Next free numeric `id` in a collection
    fn next_id(&self, collection: Collection) -> Result<i64>;

    /// Whether the backing store carries this collection at all
    fn has_collection(&self, _collection: Collection) -> bool {
        true
    }

    /// Get a typed entity by identity key
    fn get_entity<T: Entity>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        self.get(T::COLLECTION, key)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    /// Insert or replace a typed entity
    fn put_entity<T: Entity>(&self, entity: &T) -> Result<()>
    where
        Self: Sized,
    {
        self.put(T::COLLECTION, &serde_json::to_value(entity)?)
    }

    /// List typed entities scoped to a race
    fn list_entities_for_race<T: Entity>(&self, race_id: i64) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        self.list_for_race(T::COLLECTION, race_id)?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Error::from))
            .collect()
    }
}

/// `SQLite` implementation of `EntityRepository`
pub struct SqliteEntityRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteEntityRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_bodies(bodies: Vec<String>) -> Result<Vec<Value>> {
        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }
}

/// Identity key and owning race of a raw record
fn identity(collection: Collection, record: &Value) -> Result<(String, i64)> {
    let key = collection.key_of(record).ok_or_else(|| {
        Error::InvalidInput(format!("{collection} record has no identity key"))
    })?;
    let race_id = collection
        .race_id_of(record)
        .ok_or_else(|| Error::InvalidInput(format!("{collection} record {key} has no race id")))?;
    Ok((key, race_id))
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM entities WHERE collection = ? AND entity_key = ?",
                params![collection.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| serde_json::from_str(&body).map_err(Error::from))
            .transpose()
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<()> {
        let (key, race_id) = identity(collection, record)?;
        self.conn.execute(
            "INSERT INTO entities (collection, entity_key, race_id, body) VALUES (?, ?, ?, ?)
             ON CONFLICT (collection, entity_key)
             DO UPDATE SET race_id = excluded.race_id, body = excluded.body",
            params![collection.as_str(), key, race_id, serde_json::to_string(record)?],
        )?;
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM entities WHERE collection = ? AND entity_key = ?",
            params![collection.as_str(), key],
        )?;
        Ok(rows > 0)
    }

    fn bulk_add(&self, collection: Collection, records: &[Value]) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO entities (collection, entity_key, race_id, body) VALUES (?, ?, ?, ?)",
        )?;

        for record in records {
            let (key, race_id) = identity(collection, record)?;
            stmt.execute(params![
                collection.as_str(),
                key,
                race_id,
                serde_json::to_string(record)?
            ])?;
        }

        Ok(records.len())
    }

    fn list_for_race(&self, collection: Collection, race_id: i64) -> Result<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM entities
             WHERE collection = ? AND race_id = ?
             ORDER BY rowid ASC",
        )?;

        let bodies = stmt
            .query_map(params![collection.as_str(), race_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Self::parse_bodies(bodies)
    }

    fn list_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM entities
             WHERE collection = ?
             ORDER BY rowid ASC",
        )?;

        let bodies = stmt
            .query_map(params![collection.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Self::parse_bodies(bodies)
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE collection = ?",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn next_id(&self, collection: Collection) -> Result<i64> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(CAST(json_extract(body, '$.id') AS INTEGER)), 0) + 1
             FROM entities WHERE collection = ?",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{CheckpointRunner, Runner, RunnerStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        let runner = json!({"id": 1, "raceId": 3, "number": 101, "status": "not-started"});
        repo.put(Collection::Runners, &runner).unwrap();

        assert_eq!(repo.get(Collection::Runners, "1").unwrap(), Some(runner));
        assert_eq!(repo.get(Collection::Races, "1").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_existing() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        repo.put(Collection::Runners, &json!({"id": 1, "raceId": 3, "status": "not-started"}))
            .unwrap();
        repo.put(Collection::Runners, &json!({"id": 1, "raceId": 3, "status": "passed"}))
            .unwrap();

        assert_eq!(repo.count(Collection::Runners).unwrap(), 1);
        let stored = repo.get(Collection::Runners, "1").unwrap().unwrap();
        assert_eq!(stored["status"], json!("passed"));
    }

    #[test]
    fn test_put_rejects_record_without_identity() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        let err = repo
            .put(Collection::CheckpointRunners, &json!({"raceId": 1, "number": 4}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_bulk_add_fails_on_existing_key() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        let added = repo
            .bulk_add(
                Collection::Checkpoints,
                &[
                    json!({"id": 1, "raceId": 1, "number": 1, "name": "Hut"}),
                    json!({"id": 2, "raceId": 1, "number": 2, "name": "Ridge"}),
                ],
            )
            .unwrap();
        assert_eq!(added, 2);

        let duplicate = repo.bulk_add(
            Collection::Checkpoints,
            &[json!({"id": 2, "raceId": 1, "number": 2, "name": "Ridge"})],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_list_for_race_scopes_and_orders() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        repo.put(Collection::Runners, &json!({"id": 10, "raceId": 1, "number": 3}))
            .unwrap();
        repo.put(Collection::Runners, &json!({"id": 2, "raceId": 2, "number": 1}))
            .unwrap();
        repo.put(Collection::Runners, &json!({"id": 4, "raceId": 1, "number": 7}))
            .unwrap();

        let ids = repo
            .list_for_race(Collection::Runners, 1)
            .unwrap()
            .iter()
            .map(|record| record["id"].as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![10, 4]);
        assert_eq!(repo.list_all(Collection::Runners).unwrap().len(), 3);
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        repo.put(Collection::Races, &json!({"id": 1, "name": "Ridge"}))
            .unwrap();
        assert!(repo.delete(Collection::Races, "1").unwrap());
        assert!(!repo.delete(Collection::Races, "1").unwrap());
        assert!(repo.get(Collection::Races, "1").unwrap().is_none());
    }

    #[test]
    fn test_next_id() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        assert_eq!(repo.next_id(Collection::Runners).unwrap(), 1);
        repo.put(Collection::Runners, &json!({"id": 41, "raceId": 1}))
            .unwrap();
        repo.put(Collection::Runners, &json!({"id": "7", "raceId": 1}))
            .unwrap();
        assert_eq!(repo.next_id(Collection::Runners).unwrap(), 42);
    }

    #[test]
    fn test_typed_entities() {
        let db = setup();
        let repo = SqliteEntityRepository::new(db.connection());

        let mut runner = Runner::new(1, 9, 250);
        runner.status = RunnerStatus::Passed;
        repo.put_entity(&runner).unwrap();
        repo.put_entity(&CheckpointRunner::new(9, 2, 250)).unwrap();

        let fetched: Runner = repo.get_entity("1").unwrap().unwrap();
        assert_eq!(fetched, runner);

        let rows: Vec<CheckpointRunner> = repo.list_entities_for_race(9).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(repo.get(Collection::CheckpointRunners, "9:2:250").unwrap().is_some());
    }
}
