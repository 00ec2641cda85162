//! Catalog loaders.
//!
//! A loader returns the complete replacement row set for a catalog. Loaders never
//! touch the published catalog; the runtime decides whether to publish.

use super::entities::{Creative, Folder, Owner};
use super::pseudonyms::Pseudonyms;
use super::snapshot_file::SnapshotFile;
use crate::error::{BidderError, Result};
use crate::types::{DimensionId, FolderId};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which spelling of the targeting table the catalog database uses.
///
/// Resolved once per reload and cached on the catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionSchema {
    #[default]
    Dimensions,
    Dimentions,
}

impl DimensionSchema {
    pub fn table(&self) -> &'static str {
        match self {
            DimensionSchema::Dimensions => "dimensions",
            DimensionSchema::Dimentions => "dimentions",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            DimensionSchema::Dimensions => DimensionSchema::Dimentions,
            DimensionSchema::Dimentions => DimensionSchema::Dimensions,
        }
    }
}

/// Complete replacement set for one catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRows {
    pub folders: Vec<Folder>,
    pub creatives: Vec<Creative>,
    pub owners: Vec<Owner>,
    pub pseudonyms: Pseudonyms,
    pub schema: DimensionSchema,
}

/// Source of catalog rows.
pub trait CatalogLoader: Send + Sync {
    /// Loads a complete row set.
    ///
    /// `hint` is the schema the previous successful load resolved, if any.
    /// Implementations should try it first and report the schema they used.
    fn load(&self, hint: Option<DimensionSchema>) -> Result<CatalogRows>;

    fn describe(&self) -> String;
}

impl<L: CatalogLoader + ?Sized> CatalogLoader for Arc<L> {
    fn load(&self, hint: Option<DimensionSchema>) -> Result<CatalogRows> {
        (**self).load(hint)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ================================================================================================
// STATIC LOADER
// ================================================================================================

/// In-memory loader. Rows and failures can be swapped between reloads.
#[derive(Debug, Default)]
pub struct StaticLoader {
    rows: RwLock<CatalogRows>,
    failure: RwLock<Option<String>>,
}

impl StaticLoader {
    pub fn new(rows: CatalogRows) -> Self {
        Self {
            rows: RwLock::new(rows),
            failure: RwLock::new(None),
        }
    }

    /// Replaces the rows returned by subsequent loads.
    pub fn replace(&self, rows: CatalogRows) {
        *self.rows.write() = rows;
    }

    /// Makes subsequent loads fail with `reason` until cleared with `None`.
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.write() = reason;
    }
}

impl CatalogLoader for StaticLoader {
    fn load(&self, _hint: Option<DimensionSchema>) -> Result<CatalogRows> {
        if let Some(reason) = self.failure.read().as_ref() {
            return Err(BidderError::Reload(reason.clone()));
        }
        Ok(self.rows.read().clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ================================================================================================
// JSON FILE LOADER
// ================================================================================================

/// Loads rows from a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogLoader for JsonFileLoader {
    fn load(&self, hint: Option<DimensionSchema>) -> Result<CatalogRows> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            BidderError::Reload(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let mut doc: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            BidderError::Reload(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        // Targeting rows live under whichever table spelling the export used.
        let preferred = hint.unwrap_or_default();
        let mut schema = preferred;
        let mut targeting = doc.get_mut(preferred.table()).map(serde_json::Value::take);
        if targeting.is_none() {
            debug!(
                "{} didn't resolve, trying {}",
                preferred.table(),
                preferred.other().table()
            );
            targeting = doc
                .get_mut(preferred.other().table())
                .map(serde_json::Value::take);
            if targeting.is_some() {
                schema = preferred.other();
            }
        }

        let carries_schema = doc.get("schema").is_some();
        let mut rows: CatalogRows = serde_json::from_value(doc).map_err(|e| {
            BidderError::Reload(format!("Failed to decode {}: {}", self.path.display(), e))
        })?;
        // Without a targeting table the export's own schema stands, then the hint.
        if targeting.is_some() {
            rows.schema = schema;
        } else if !carries_schema {
            if let Some(hint) = hint {
                rows.schema = hint;
            }
        }

        if let Some(targeting) = targeting {
            let targeting: Vec<TargetingRow> = serde_json::from_value(targeting)
                .map_err(|e| BidderError::Reload(format!("Bad targeting rows: {}", e)))?;
            apply_targeting(&mut rows.folders, &targeting)?;
        }

        debug!(
            "loaded {} folders from {} ({})",
            rows.folders.len(),
            self.path.display(),
            rows.schema.table()
        );
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// One `(folder, type, value)` targeting row as exported by the catalog database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingRow {
    pub folder_id: FolderId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: DimensionId,
}

/// Folds targeting rows into their folders.
pub fn apply_targeting(folders: &mut [Folder], targeting: &[TargetingRow]) -> Result<()> {
    let index: HashMap<FolderId, usize> = folders
        .iter()
        .enumerate()
        .map(|(idx, folder)| (folder.id, idx))
        .collect();

    for row in targeting {
        let idx = index.get(&row.folder_id).ok_or_else(|| {
            BidderError::Reload(format!("targeting row for unknown folder {}", row.folder_id))
        })?;
        folders[*idx]
            .assign_target(&row.type_name, row.value)
            .map_err(BidderError::Reload)?;
    }
    Ok(())
}

// ================================================================================================
// PERSISTING LOADER
// ================================================================================================

/// Wraps a loader and writes every successful load to a snapshot file.
///
/// A failed snapshot write is logged and does not fail the load. On a cold start
/// (no schema hint, so nothing is published yet) a failed inner load is served from
/// the snapshot file instead, if one exists.
pub struct PersistingLoader<L> {
    inner: L,
    file: SnapshotFile,
}

impl<L: CatalogLoader> PersistingLoader<L> {
    pub fn new(inner: L, file: SnapshotFile) -> Self {
        Self { inner, file }
    }

    pub fn snapshot_file(&self) -> &SnapshotFile {
        &self.file
    }
}

impl<L: CatalogLoader> CatalogLoader for PersistingLoader<L> {
    fn load(&self, hint: Option<DimensionSchema>) -> Result<CatalogRows> {
        let rows = match self.inner.load(hint) {
            Ok(rows) => rows,
            Err(e) if hint.is_none() && self.file.exists() => {
                warn!(
                    "{} failed on cold start, using snapshot {}: {}",
                    self.inner.describe(),
                    self.file.path().display(),
                    e
                );
                return self.file.load(None);
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = self.file.write(&rows) {
            warn!("Failed to persist catalog snapshot: {}", e);
        }
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} (persisting)", self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_loader_failure_toggle() {
        let loader = StaticLoader::new(CatalogRows::default());
        assert!(loader.load(None).is_ok());

        loader.set_failure(Some("database down".to_string()));
        let err = loader.load(None).unwrap_err();
        assert_eq!(err, BidderError::Reload("database down".to_string()));

        loader.set_failure(None);
        assert!(loader.load(None).is_ok());
    }

    #[test]
    fn test_json_file_loader() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("catalog.json");
        let rows = CatalogRows {
            folders: vec![Folder {
                id: 5,
                active: true,
                cpc: 50,
                ..Default::default()
            }],
            schema: DimensionSchema::Dimentions,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_vec(&rows).unwrap()).unwrap();

        let loaded = JsonFileLoader::new(&path).load(None).unwrap();
        assert_eq!(loaded.folders[0].id, 5);
        assert_eq!(loaded.schema, DimensionSchema::Dimentions);
    }

    #[test]
    fn test_json_file_loader_keeps_hint_without_targeting_table() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("catalog.json");
        let doc = serde_json::json!({ "folders": [{ "id": 5, "active": true }] });
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let loader = JsonFileLoader::new(&path);
        let rows = loader.load(Some(DimensionSchema::Dimentions)).unwrap();
        assert_eq!(rows.schema, DimensionSchema::Dimentions);
        assert_eq!(rows.folders[0].id, 5);

        let rows = loader.load(None).unwrap();
        assert_eq!(rows.schema, DimensionSchema::Dimensions);
    }

    #[test]
    fn test_json_file_loader_prefers_carried_schema_over_hint() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("catalog.json");
        let rows = CatalogRows {
            schema: DimensionSchema::Dimensions,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_vec(&rows).unwrap()).unwrap();

        let loaded = JsonFileLoader::new(&path)
            .load(Some(DimensionSchema::Dimentions))
            .unwrap();
        assert_eq!(loaded.schema, DimensionSchema::Dimensions);
    }

    #[test]
    fn test_json_file_loader_resolves_misspelled_table() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("catalog.json");
        let doc = serde_json::json!({
            "folders": [{ "id": 5, "active": true }],
            "dimentions": [
                { "folder_id": 5, "type": "App\\Models\\Network", "value": 1 },
                { "folder_id": 5, "type": "Network", "value": 2 }
            ]
        });
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let rows = JsonFileLoader::new(&path).load(None).unwrap();
        assert_eq!(rows.schema, DimensionSchema::Dimentions);
        assert!(rows.folders[0].targets.network.matches(2));
        assert!(!rows.folders[0].targets.network.matches(3));
    }

    #[test]
    fn test_targeting_row_for_unknown_folder_fails() {
        let mut folders = vec![Folder {
            id: 1,
            ..Default::default()
        }];
        let rows = vec![TargetingRow {
            folder_id: 9,
            type_name: "Brand".to_string(),
            value: 6,
        }];
        assert!(apply_targeting(&mut folders, &rows).is_err());
    }

    #[test]
    fn test_json_file_loader_missing_file() {
        let err = JsonFileLoader::new("/nonexistent/catalog.json")
            .load(None)
            .unwrap_err();
        assert!(matches!(err, BidderError::Reload(_)));
    }

    #[test]
    fn test_persisting_loader_writes_and_serves_cold_start() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(tmp_dir.path().join("catalog.snap"));
        let inner = Arc::new(StaticLoader::new(CatalogRows {
            folders: vec![Folder {
                id: 3,
                ..Default::default()
            }],
            ..Default::default()
        }));
        let loader = PersistingLoader::new(Arc::clone(&inner), file);

        loader.load(None).unwrap();
        assert!(loader.snapshot_file().exists());

        inner.set_failure(Some("database down".to_string()));
        let rows = loader.load(None).unwrap();
        assert_eq!(rows.folders[0].id, 3);

        // Once a catalog is live the failure surfaces instead.
        let err = loader.load(Some(DimensionSchema::Dimensions)).unwrap_err();
        assert_eq!(err, BidderError::Reload("database down".to_string()));
    }
}
