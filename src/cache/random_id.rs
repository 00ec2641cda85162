//! Random numeric handles for stored values.

use super::CacheStore;
use crate::error::{BidderError, Result};
use log::debug;
use rand::Rng;

/// Attempts made by [`RandomIdIssuer::find_id`] before giving up.
pub const ID_ATTEMPTS: usize = 7;

/// Stores values under fresh random keys and hands the key back as the handle.
///
/// Relies on the wrapped store rejecting an existing key; any store error, collision
/// or not, consumes one attempt. There is no backoff between attempts.
#[derive(Debug)]
pub struct RandomIdIssuer<S> {
    store: S,
    attempts: usize,
}

impl<S: CacheStore> RandomIdIssuer<S> {
    pub fn new(store: S) -> Self {
        Self::with_attempts(store, ID_ATTEMPTS)
    }

    pub fn with_attempts(store: S, attempts: usize) -> Self {
        Self {
            store,
            attempts: attempts.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Stores `value` under a new random handle and returns the handle.
    pub fn find_id(&self, value: &str) -> Result<u64> {
        let mut rng = rand::thread_rng();
        let mut last = None;

        for attempt in 1..=self.attempts {
            let id = rng.gen::<u64>() & i64::MAX as u64;
            match self.store.store(&id.to_string(), value) {
                Ok(()) => return Ok(id),
                Err(e) => {
                    debug!("handle attempt {} of {} failed: {}", attempt, self.attempts, e);
                    last = Some(e);
                }
            }
        }

        Err(BidderError::IdExhausted {
            attempts: self.attempts,
            last: Box::new(last.unwrap_or_else(|| {
                BidderError::CacheIo("no attempt was made".to_string())
            })),
        })
    }

    /// Loads the value stored under `id`.
    pub fn load(&self, id: u64) -> Result<String> {
        self.store.load(&id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOp, CountingStore, MemoryStore};

    #[test]
    fn test_find_id_stores_value() {
        let issuer = RandomIdIssuer::new(MemoryStore::new("ids"));
        let id = issuer.find_id("payload").unwrap();

        assert!(id <= i64::MAX as u64);
        assert_eq!(issuer.load(id).unwrap(), "payload");
        assert_eq!(issuer.store().len(), 1);
    }

    #[test]
    fn test_distinct_handles() {
        let issuer = RandomIdIssuer::new(MemoryStore::new("ids"));
        let a = issuer.find_id("a").unwrap();
        let b = issuer.find_id("b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_exhaustion_after_bounded_attempts() {
        let store = CountingStore::with_callback(|_, op| match op {
            CacheOp::Store { key, .. } => Err(BidderError::KeyCollision { key }),
            CacheOp::Load { key } => Err(BidderError::CacheMiss { key }),
        });
        let issuer = RandomIdIssuer::new(store);

        let err = issuer.find_id("payload").unwrap_err();
        match err {
            BidderError::IdExhausted { attempts, last } => {
                assert_eq!(attempts, ID_ATTEMPTS);
                assert!(matches!(*last, BidderError::KeyCollision { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(issuer.store().count(), ID_ATTEMPTS);
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let store = CountingStore::with_callback(|n, op| match op {
            CacheOp::Store { .. } if n < 3 => Err(BidderError::CacheIo("busy".to_string())),
            _ => Ok(String::new()),
        });
        let issuer = RandomIdIssuer::with_attempts(store, 5);

        assert!(issuer.find_id("payload").is_ok());
        assert_eq!(issuer.store().count(), 3);
    }
}
