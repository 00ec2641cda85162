//! Demand catalog: folders, creatives, owners and reference tables.
//!
//! - **entities**: row types and targeting sets
//! - **snapshot**: the immutable, indexed [`Catalog`] served to decisions
//! - **loader**: sources of complete replacement row sets
//! - **snapshot_file**: last known good rows on disk for warm restarts

pub mod entities;
pub mod loader;
pub mod pseudonyms;
pub mod snapshot;
pub mod snapshot_file;

pub use entities::{Creative, Folder, Owner, TargetSet, Targets};
pub use loader::{
    apply_targeting, CatalogLoader, CatalogRows, DimensionSchema, JsonFileLoader,
    PersistingLoader, StaticLoader, TargetingRow,
};
pub use pseudonyms::{NameTable, Pseudonyms, Subchannel};
pub use snapshot::{Catalog, CatalogStats};
pub use snapshot_file::SnapshotFile;
