//! SQLite-backed write-once store for recall handles that must survive restarts.

use super::CacheStore;
use crate::error::{BidderError, Result};
use crate::types::now_ms;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::fs;
use std::path::{Path, PathBuf};

pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteStore {
    /// Opens or creates the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BidderError::CacheIo(format!("Failed to create directory: {}", e)))?;
        }
        let conn = Connection::open(&path)
            .map_err(|e| BidderError::CacheIo(format!("Failed to open sqlite db: {}", e)))?;
        Self::init(conn, Some(path))
    }

    /// Non-persistent database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BidderError::CacheIo(format!("Failed to open sqlite db: {}", e)))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS recalls (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| BidderError::CacheIo(format!("Failed to create recalls table: {}", e)))?;

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM recalls", [], |row| row.get(0))
            .map_err(|e| BidderError::CacheIo(format!("Failed to count recalls: {}", e)))?;
        Ok(count as usize)
    }
}

impl CacheStore for SqliteStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let result = self.conn.lock().execute(
            "INSERT INTO recalls (key, value, created_at) VALUES (?1, ?2, ?3)",
            params![key, value, now_ms() as i64],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(BidderError::KeyCollision {
                    key: key.to_string(),
                })
            }
            Err(e) => Err(BidderError::CacheIo(format!(
                "Failed to insert recall: {}",
                e
            ))),
        }
    }

    fn load(&self, key: &str) -> Result<String> {
        let result = self.conn.lock().query_row(
            "SELECT value FROM recalls WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(BidderError::CacheMiss {
                key: key.to_string(),
            }),
            Err(e) => Err(BidderError::CacheIo(format!("Failed to load recall: {}", e))),
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite store {}", path.display()),
            None => "sqlite store (memory)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store("42", "{\"a\":1}").unwrap();
        assert_eq!(store.load("42").unwrap(), "{\"a\":1}");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_collision_and_miss() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.store("42", "first").unwrap();

        let err = store.store("42", "second").unwrap_err();
        assert!(matches!(err, BidderError::KeyCollision { .. }));
        assert_eq!(store.load("42").unwrap(), "first");

        let err = store.load("43").unwrap_err();
        assert!(matches!(err, BidderError::CacheMiss { .. }));
    }

    #[test]
    fn test_survives_reopen() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("db/recalls.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.store("7", "kept").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load("7").unwrap(), "kept");
    }
}
