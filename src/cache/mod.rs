//! Keyed cache layer for decision snapshots.
//!
//! - **memory**, **sqlite**: write-once [`CacheStore`] backends
//! - **shard**: routes keys across child stores with an optional load fallback
//! - **random_id**: issues random numeric handles by storing under them
//! - **counting**: counts operations, optionally delegating to a callback
//! - **recall**: saves and fetches [`DecisionSnapshot`](crate::decision::DecisionSnapshot)s
//!
//! None of these layers retry a failed backend call, except the random id issuer
//! which retries a bounded number of times with fresh keys.

pub mod counting;
pub mod memory;
pub mod random_id;
pub mod recall;
pub mod shard;
pub mod sqlite;

pub use counting::{CacheOp, CountingStore};
pub use memory::MemoryStore;
pub use random_id::{RandomIdIssuer, ID_ATTEMPTS};
pub use recall::RecallStore;
pub use shard::{shard_key, ShardRouter};
pub use sqlite::SqliteStore;

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// String key/value store primitive. Safe for concurrent callers.
pub trait CacheStore: Send + Sync {
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Loads a value. A missing key is an error ([`BidderError::CacheMiss`](crate::BidderError)).
    fn load(&self, key: &str) -> Result<String>;

    fn describe(&self) -> String;
}

impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        (**self).store(key, value)
    }

    fn load(&self, key: &str) -> Result<String> {
        (**self).load(key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        (**self).store(key, value)
    }

    fn load(&self, key: &str) -> Result<String> {
        (**self).load(key)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Builds the recall backend: `shard_count` SQLite shards next to `db_path`, or
/// in-memory shards when no path is configured.
///
/// Shard `i` of `recalls.db` lives at `recalls-i.db`.
pub fn open_backend(shard_count: usize, db_path: Option<&Path>) -> Result<ShardRouter> {
    let mut children: Vec<Box<dyn CacheStore>> = Vec::with_capacity(shard_count);
    for i in 0..shard_count {
        match db_path {
            Some(path) => children.push(Box::new(SqliteStore::open(shard_path(path, i))?)),
            None => children.push(Box::new(MemoryStore::new(format!("shard-{}", i)))),
        }
    }
    ShardRouter::new(children)
}

fn shard_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recalls".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_paths() {
        assert_eq!(
            shard_path(Path::new("/var/bidder/recalls.db"), 2),
            PathBuf::from("/var/bidder/recalls-2.db")
        );
        assert_eq!(
            shard_path(Path::new("recalls"), 0),
            PathBuf::from("recalls-0")
        );
    }

    #[test]
    fn test_open_memory_backend() {
        let router = open_backend(3, None).unwrap();
        assert_eq!(router.shard_count(), 3);
        router.store("4", "x").unwrap();
        assert_eq!(router.load("4").unwrap(), "x");
    }

    #[test]
    fn test_open_sqlite_backend() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("recalls.db");

        let router = open_backend(2, Some(path.as_path())).unwrap();
        router.store("5", "five").unwrap();
        assert!(tmp_dir.path().join("recalls-1.db").exists());

        let reopened = open_backend(2, Some(path.as_path())).unwrap();
        assert_eq!(reopened.load("5").unwrap(), "five");
    }
}
