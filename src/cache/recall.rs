//! Stashes decision snapshots under opaque handles and recalls them later.

use super::{CacheStore, RandomIdIssuer};
use crate::decision::DecisionSnapshot;
use crate::error::{BidderError, Result};
use log::debug;

#[derive(Debug)]
pub struct RecallStore<S> {
    issuer: RandomIdIssuer<S>,
}

impl<S: CacheStore> RecallStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            issuer: RandomIdIssuer::new(store),
        }
    }

    pub fn with_attempts(store: S, attempts: usize) -> Self {
        Self {
            issuer: RandomIdIssuer::with_attempts(store, attempts),
        }
    }

    pub fn store(&self) -> &S {
        self.issuer.store()
    }

    /// Serializes `snapshot` to JSON and stores it under a fresh handle.
    pub fn save(&self, snapshot: &DecisionSnapshot) -> Result<u64> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| BidderError::Codec(format!("Failed to encode snapshot: {}", e)))?;
        let handle = self.issuer.find_id(&json)?;
        debug!(
            "stashed folder {} creative {} as {}",
            snapshot.folder_id, snapshot.creative_id, handle
        );
        Ok(handle)
    }

    pub fn fetch(&self, handle: u64) -> Result<DecisionSnapshot> {
        let json = self.issuer.load(handle)?;
        serde_json::from_str(&json)
            .map_err(|e| BidderError::Codec(format!("Failed to decode snapshot {}: {}", handle, e)))
    }
}
