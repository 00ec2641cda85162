//! On-demand catalog refresh.

use crate::error::Result;
use crate::runtime::RuntimeManager;
use crate::types::now_ms;
use std::sync::Arc;

/// Statistics from a refresh operation.
#[derive(Debug, Clone)]
pub struct RefreshStats {
    /// Version of the newly published catalog
    pub version: u64,
    pub folders_loaded: usize,
    pub creatives_loaded: usize,
    /// Duration of refresh operation in milliseconds
    pub duration_ms: u64,
    /// Timestamp of refresh
    pub timestamp: u64,
}

/// Catalog refresh service.
#[derive(Debug, Clone)]
pub struct RefreshService {
    runtime: Arc<RuntimeManager>,
}

impl RefreshService {
    pub fn new(runtime: Arc<RuntimeManager>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<RuntimeManager> {
        &self.runtime
    }

    /// Reloads the catalog now.
    ///
    /// On failure the previously published catalog stays live and the reload error
    /// is returned.
    pub fn refresh(&self) -> Result<RefreshStats> {
        let start = now_ms();
        let catalog = self.runtime.reload()?;
        let stats = catalog.stats();

        Ok(RefreshStats {
            version: stats.version,
            folders_loaded: stats.folders,
            creatives_loaded: stats.creatives,
            duration_ms: now_ms().saturating_sub(start),
            timestamp: now_ms(),
        })
    }
}
