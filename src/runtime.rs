//! Runtime manager - owns the published catalog and hot-reloads it.
//!
//! # Reload protocol
//! - A reload builds a brand-new [`Catalog`] from the loader, off to the side
//! - On success the new catalog is published with a single atomic pointer swap
//! - On failure the previously published catalog stays authoritative
//!
//! Readers call [`RuntimeManager::snapshot`], which never blocks on a reload, and keep
//! the returned `Arc` for the whole decision. An old catalog is dropped once the last
//! in-flight reader releases it.
//!
//! Reloads assume a single writer; concurrent `reload` calls are not coordinated.

use crate::catalog::{Catalog, CatalogLoader};
use crate::error::{BidderError, Result};
use crate::types::now_ms;
use arc_swap::ArcSwapOption;
use log::{error, info};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of the published catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    /// Nothing published yet
    Empty,
    /// A reload is building a new catalog
    WarmingUp,
    /// A catalog is published
    Live,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeState::Empty => write!(f, "empty"),
            RuntimeState::WarmingUp => write!(f, "warming-up"),
            RuntimeState::Live => write!(f, "live"),
        }
    }
}

pub struct RuntimeManager {
    loader: Box<dyn CatalogLoader>,
    /// Currently published catalog
    published: ArcSwapOption<Catalog>,
    state: RwLock<RuntimeState>,
    created_at: u64,
}

impl fmt::Debug for RuntimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeManager")
            .field("loader", &self.loader.describe())
            .field("state", &self.state())
            .field("version", &self.version())
            .finish()
    }
}

impl RuntimeManager {
    /// Creates a manager in the `Empty` state. Nothing is loaded until [`reload`](Self::reload).
    pub fn new(loader: Box<dyn CatalogLoader>) -> Self {
        Self {
            loader,
            published: ArcSwapOption::empty(),
            state: RwLock::new(RuntimeState::Empty),
            created_at: now_ms(),
        }
    }

    // ============================================================================================
    // ACCESSORS
    // ============================================================================================

    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// The currently published catalog, if any. Constant time, never blocks on a reload.
    pub fn snapshot(&self) -> Option<Arc<Catalog>> {
        self.published.load_full()
    }

    /// Version of the published catalog, `0` when empty.
    pub fn version(&self) -> u64 {
        self.published
            .load()
            .as_ref()
            .map(|catalog| catalog.version())
            .unwrap_or(0)
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn loader_description(&self) -> String {
        self.loader.describe()
    }

    // ============================================================================================
    // RELOAD
    // ============================================================================================

    /// Loads and publishes a new catalog.
    ///
    /// Any loader or validation failure is returned as [`BidderError::Reload`] and leaves
    /// the published catalog untouched.
    pub fn reload(&self) -> Result<Arc<Catalog>> {
        let previous_state = self.state();
        *self.state.write() = RuntimeState::WarmingUp;

        let current = self.published.load_full();
        let hint = current.as_ref().map(|catalog| catalog.schema());
        let version = current.as_ref().map(|catalog| catalog.version()).unwrap_or(0) + 1;

        let built = self
            .loader
            .load(hint)
            .and_then(|rows| Catalog::build(rows, version));

        match built {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                self.published.store(Some(Arc::clone(&catalog)));
                *self.state.write() = RuntimeState::Live;

                let stats = catalog.stats();
                info!(
                    "catalog v{} published from {}: {} folders ({} roots), {} creatives, {} owners",
                    stats.version,
                    self.loader.describe(),
                    stats.folders,
                    stats.root_folders,
                    stats.creatives,
                    stats.owners
                );
                Ok(catalog)
            }
            Err(e) => {
                *self.state.write() = previous_state;
                error!(
                    "catalog reload from {} failed, keeping v{}: {}",
                    self.loader.describe(),
                    self.version(),
                    e
                );
                Err(match e {
                    BidderError::Reload(_) => e,
                    other => BidderError::Reload(other.to_string()),
                })
            }
        }
    }
}
