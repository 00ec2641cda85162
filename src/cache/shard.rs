//! Shard router: spreads keys over child stores and falls back on failed loads.

use super::CacheStore;
use crate::error::{BidderError, Result};
use flate2::Crc;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Numeric routing key for `key`.
///
/// Keys that parse as an unsigned integer route by their value; any other key routes
/// by the CRC-32 of its bytes.
pub fn shard_key(key: &str) -> u64 {
    match key.parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            let mut crc = Crc::new();
            crc.update(key.as_bytes());
            crc.sum() as u64
        }
    }
}

pub struct ShardRouter {
    children: Vec<Box<dyn CacheStore>>,
    fallback: Option<Box<dyn CacheStore>>,
    /// Store and load calls routed since the last report
    total_count: AtomicU64,
}

impl std::fmt::Debug for ShardRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardRouter")
            .field("children", &self.children.len())
            .field("fallback", &self.fallback.as_ref().map(|s| s.describe()))
            .field("total_count", &self.total_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl ShardRouter {
    pub fn new(children: Vec<Box<dyn CacheStore>>) -> Result<Self> {
        if children.is_empty() {
            return Err(BidderError::Config(
                "shard router needs at least one child store".to_string(),
            ));
        }

        Ok(Self {
            children,
            fallback: None,
            total_count: AtomicU64::new(0),
        })
    }

    /// Store consulted when a shard fails to load a key.
    pub fn with_fallback(mut self, fallback: Box<dyn CacheStore>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn shard_count(&self) -> usize {
        self.children.len()
    }

    /// Index of the child that owns `key`.
    pub fn shard_index(&self, key: &str) -> usize {
        (shard_key(key) % self.children.len() as u64) as usize
    }

    fn pick(&self, key: &str) -> &dyn CacheStore {
        self.children[self.shard_index(key)].as_ref()
    }

    /// Routed calls since the previous report.
    pub fn pending_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Describes the router and its children, resetting the call count.
    ///
    /// Returns `None` when nothing was routed since the previous report.
    pub fn take_report(&self) -> Option<String> {
        let count = self.total_count.swap(0, Ordering::Relaxed);
        if count == 0 {
            return None;
        }

        let mut lines = vec![format!("shard router counts (total {})", count)];
        for (i, child) in self.children.iter().enumerate() {
            lines.push(format!("child {}: {}", i, child.describe()));
        }
        Some(lines.join("\n"))
    }
}

impl CacheStore for ShardRouter {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.total_count.fetch_add(1, Ordering::Relaxed);
        self.pick(key).store(key, value)
    }

    fn load(&self, key: &str) -> Result<String> {
        self.total_count.fetch_add(1, Ordering::Relaxed);
        let shard = self.pick(key);

        match shard.load(key) {
            Ok(value) => Ok(value),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    match &e {
                        BidderError::CacheMiss { .. } => {
                            debug!("{} missed '{}', trying fallback", shard.describe(), key)
                        }
                        _ => warn!(
                            "{} failed to load '{}', trying {}: {}",
                            shard.describe(),
                            key,
                            fallback.describe(),
                            e
                        ),
                    }
                    fallback.load(key)
                }
                None => Err(e),
            },
        }
    }

    fn describe(&self) -> String {
        format!(
            "shard router over {} stores{}",
            self.children.len(),
            if self.fallback.is_some() {
                " with fallback"
            } else {
                ""
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::sync::Arc;

    fn router(n: usize) -> (ShardRouter, Vec<Arc<MemoryStore>>) {
        let shards: Vec<Arc<MemoryStore>> = (0..n)
            .map(|i| Arc::new(MemoryStore::new(format!("shard-{}", i))))
            .collect();
        let children = shards
            .iter()
            .map(|s| Box::new(Arc::clone(s)) as Box<dyn CacheStore>)
            .collect();
        (ShardRouter::new(children).unwrap(), shards)
    }

    #[test]
    fn test_numeric_keys_route_by_value() {
        let (router, shards) = router(3);
        router.store("10", "ten").unwrap();
        router.store("11", "eleven").unwrap();

        assert!(shards[1].contains("10"));
        assert!(shards[2].contains("11"));
        assert_eq!(router.load("10").unwrap(), "ten");
    }

    #[test]
    fn test_text_keys_route_by_checksum() {
        let mut crc = Crc::new();
        crc.update(b"abc");
        assert_eq!(shard_key("abc"), crc.sum() as u64);
        assert_eq!(shard_key("abc"), 0x3524_41c2);

        let (router, shards) = router(4);
        router.store("abc", "v").unwrap();
        assert!(shards[(0x3524_41c2u64 % 4) as usize].contains("abc"));
    }

    #[test]
    fn test_no_children_rejected() {
        assert!(matches!(
            ShardRouter::new(Vec::new()),
            Err(BidderError::Config(_))
        ));
    }

    #[test]
    fn test_load_falls_back() {
        let fallback = Arc::new(MemoryStore::new("fallback"));
        fallback.store("5", "from fallback").unwrap();

        let (router, _) = router(2);
        let router = router.with_fallback(Box::new(Arc::clone(&fallback)));

        assert_eq!(router.load("5").unwrap(), "from fallback");
        assert!(matches!(
            router.load("6"),
            Err(BidderError::CacheMiss { .. })
        ));
    }

    #[test]
    fn test_miss_without_fallback_surfaces() {
        let (router, _) = router(2);
        assert!(matches!(
            router.load("5"),
            Err(BidderError::CacheMiss { .. })
        ));
    }

    #[test]
    fn test_store_errors_are_not_retried() {
        let (router, _) = router(2);
        router.store("8", "a").unwrap();
        assert!(matches!(
            router.store("8", "b"),
            Err(BidderError::KeyCollision { .. })
        ));
    }

    #[test]
    fn test_take_report_resets() {
        let (router, _) = router(2);
        router.store("1", "a").unwrap();
        let _ = router.load("1");
        let _ = router.load("2");

        assert_eq!(router.pending_count(), 3);
        let report = router.take_report().unwrap();
        assert!(report.starts_with("shard router counts (total 3)"));
        assert!(report.contains("child 1: memory store shard-1 (1 keys)"));
        assert!(router.take_report().is_none());
    }
}
