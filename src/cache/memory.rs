//! In-process write-once store.

use super::CacheStore;
use crate::error::{BidderError, Result};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// HashMap-backed store. Storing an existing key is a collision.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl CacheStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        match self.data.write().entry(key.to_string()) {
            Entry::Occupied(_) => Err(BidderError::KeyCollision {
                key: key.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(())
            }
        }
    }

    fn load(&self, key: &str) -> Result<String> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BidderError::CacheMiss {
                key: key.to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("memory store {} ({} keys)", self.name, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let store = MemoryStore::new("t");
        store.store("1", "one").unwrap();
        assert_eq!(store.load("1").unwrap(), "one");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_key_is_miss() {
        let store = MemoryStore::new("t");
        assert_eq!(
            store.load("nope").unwrap_err(),
            BidderError::CacheMiss {
                key: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_write_once() {
        let store = MemoryStore::new("t");
        store.store("1", "one").unwrap();
        let err = store.store("1", "uno").unwrap_err();
        assert!(matches!(err, BidderError::KeyCollision { .. }));
        assert_eq!(store.load("1").unwrap(), "one");
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new("t");
        store.store("1", "one").unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("1"));
    }
}
