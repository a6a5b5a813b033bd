//! SQLite-backed persistence.
//!
//! Two tables:
//! - `kv`: scalar timer state and settings, stored as text
//! - `blobs`: JSON documents (accumulation map, accrual window, interruption log)

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::data_dir;
use super::kv::Persistence;
use crate::error::{CoreError, DatabaseError};

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/tomado.db`, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("tomado.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS blobs (
                    key   TEXT PRIMARY KEY,
                    value BLOB NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn blob_get(&self, key: &str) -> Result<Option<Vec<u8>>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM blobs WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()
    }

    pub fn blob_set(&self, key: &str, bytes: &[u8]) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO blobs (key, value) VALUES (?1, ?2)",
            params![key, bytes],
        )?;
        Ok(())
    }

    /// Remove `key` from both tables.
    pub fn delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM blobs WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl Persistence for Database {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.kv_get(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "kv read failed");
            None
        })
    }

    fn set_raw(&self, key: &str, value: &str) {
        if let Err(e) = self.kv_set(key, value) {
            warn!(key, error = %e, "kv write failed");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.delete(key) {
            warn!(key, error = %e, "kv delete failed");
        }
    }

    fn get_blob(&self, key: &str) -> Option<Vec<u8>> {
        self.blob_get(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "blob read failed");
            None
        })
    }

    fn set_blob(&self, key: &str, bytes: &[u8]) {
        if let Err(e) = self.blob_set(key, bytes) {
            warn!(key, error = %e, "blob write failed");
        }
    }
}
