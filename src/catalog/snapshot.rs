//! Immutable catalog snapshot.

use super::entities::{Creative, Folder, Owner};
use super::loader::{CatalogRows, DimensionSchema};
use super::pseudonyms::Pseudonyms;
use crate::error::{BidderError, Result};
use crate::types::{now_ms, CreativeId, FolderId, OwnerId};
use std::collections::{HashMap, HashSet};

/// Point-in-time copy of all demand used to serve decisions.
///
/// A catalog is built once per reload and never mutated afterwards; readers
/// hold it through an `Arc` for as long as their decision runs.
#[derive(Debug)]
pub struct Catalog {
    version: u64,
    loaded_at: u64,
    schema: DimensionSchema,
    /// Folders in load order
    folders: Vec<Folder>,
    folder_index: HashMap<FolderId, usize>,
    creatives: HashMap<CreativeId, Creative>,
    owners: HashMap<OwnerId, Owner>,
    pseudonyms: Pseudonyms,
}

impl Catalog {
    /// Builds a catalog from a complete row set.
    ///
    /// Parent/child links are normalized so both directions agree. Duplicate ids,
    /// dangling links, folders with two parents and cycles are rejected.
    pub fn build(rows: CatalogRows, version: u64) -> Result<Self> {
        let CatalogRows {
            mut folders,
            creatives,
            owners,
            pseudonyms,
            schema,
        } = rows;

        let mut folder_index = HashMap::with_capacity(folders.len());
        for (idx, folder) in folders.iter().enumerate() {
            if folder_index.insert(folder.id, idx).is_some() {
                return Err(invalid(format!("duplicate folder id {}", folder.id)));
            }
        }

        // Links as (parent, child), gathered from both directions
        let mut links = Vec::new();
        for folder in &folders {
            for child in &folder.children {
                links.push((folder.id, *child));
            }
            if let Some(parent) = folder.parent_id {
                links.push((parent, folder.id));
            }
        }

        for (parent, child) in links {
            if parent == child {
                return Err(invalid(format!("folder {} is its own parent", child)));
            }
            let parent_idx = *folder_index
                .get(&parent)
                .ok_or_else(|| invalid(format!("folder {} links unknown parent {}", child, parent)))?;
            let child_idx = *folder_index
                .get(&child)
                .ok_or_else(|| invalid(format!("folder {} links unknown child {}", parent, child)))?;

            match folders[child_idx].parent_id {
                None => folders[child_idx].parent_id = Some(parent),
                Some(existing) if existing != parent => {
                    return Err(invalid(format!(
                        "folder {} has two parents ({} and {})",
                        child, existing, parent
                    )));
                }
                Some(_) => {}
            }
            if !folders[parent_idx].children.contains(&child) {
                folders[parent_idx].children.push(child);
            }
        }

        check_acyclic(&folders, &folder_index)?;

        let mut creative_map = HashMap::with_capacity(creatives.len());
        for creative in creatives {
            let id = creative.id;
            if creative_map.insert(id, creative).is_some() {
                return Err(invalid(format!("duplicate creative id {}", id)));
            }
        }

        let mut owner_map = HashMap::with_capacity(owners.len());
        for owner in owners {
            let id = owner.id;
            if owner_map.insert(id, owner).is_some() {
                return Err(invalid(format!("duplicate owner id {}", id)));
            }
        }

        Ok(Catalog {
            version,
            loaded_at: now_ms(),
            schema,
            folders,
            folder_index,
            creatives: creative_map,
            owners: owner_map,
            pseudonyms,
        })
    }

    // ============================================================================================
    // ACCESSORS
    // ============================================================================================

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> u64 {
        self.loaded_at
    }

    /// Targeting table spelling resolved at load time.
    pub fn schema(&self) -> DimensionSchema {
        self.schema
    }

    pub fn pseudonyms(&self) -> &Pseudonyms {
        &self.pseudonyms
    }

    /// All folders in load order.
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folder_index.get(&id).map(|idx| &self.folders[*idx])
    }

    pub fn creative(&self, id: CreativeId) -> Option<&Creative> {
        self.creatives.get(&id)
    }

    pub fn owner(&self, id: OwnerId) -> Option<&Owner> {
        self.owners.get(&id)
    }

    /// Folders without a parent, in load order.
    pub fn roots(&self) -> impl Iterator<Item = &Folder> {
        self.folders.iter().filter(|f| f.is_root())
    }

    /// Direct children of a folder, in the folder's child order.
    pub fn children<'a>(&'a self, folder: &'a Folder) -> impl Iterator<Item = &'a Folder> + 'a {
        folder.children.iter().filter_map(move |id| self.folder(*id))
    }

    // ============================================================================================
    // DERIVED VALUES
    // ============================================================================================

    /// Own CPC if non-zero, else the parent's own CPC, else zero.
    pub fn effective_cpc(&self, folder: &Folder) -> i64 {
        if folder.cpc != 0 {
            return folder.cpc;
        }
        folder
            .parent_id
            .and_then(|id| self.folder(id))
            .map(|parent| parent.cpc)
            .unwrap_or(0)
    }

    /// Unknown owners count as disabled.
    pub fn owner_enabled(&self, owner_id: OwnerId) -> bool {
        self.owner(owner_id).map(Owner::is_enabled).unwrap_or(false)
    }

    /// Unknown creatives count as inactive.
    pub fn has_active_creative(&self, folder: &Folder) -> bool {
        folder
            .creatives
            .iter()
            .any(|id| self.creative(*id).map(|c| c.active).unwrap_or(false))
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            version: self.version,
            folders: self.folders.len(),
            root_folders: self.roots().count(),
            creatives: self.creatives.len(),
            owners: self.owners.len(),
            loaded_at: self.loaded_at,
        }
    }
}

fn invalid(msg: String) -> BidderError {
    BidderError::InvalidCatalog(msg)
}

/// Walks every parent chain, failing when a chain revisits a folder.
fn check_acyclic(folders: &[Folder], index: &HashMap<FolderId, usize>) -> Result<()> {
    let mut cleared: HashSet<FolderId> = HashSet::with_capacity(folders.len());

    for folder in folders {
        let mut path = HashSet::new();
        let mut current = Some(folder.id);

        while let Some(id) = current {
            if cleared.contains(&id) {
                break;
            }
            if !path.insert(id) {
                return Err(invalid(format!("cycle through folder {}", id)));
            }
            current = index.get(&id).and_then(|idx| folders[*idx].parent_id);
        }
        cleared.extend(path);
    }
    Ok(())
}

/// Size summary of a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub version: u64,
    pub folders: usize,
    pub root_folders: usize,
    pub creatives: usize,
    pub owners: usize,
    pub loaded_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: FolderId) -> Folder {
        Folder {
            id,
            active: true,
            owner_id: 1,
            ..Default::default()
        }
    }

    fn rows(folders: Vec<Folder>) -> CatalogRows {
        CatalogRows {
            folders,
            owners: vec![Owner { id: 1, status: 0 }],
            ..Default::default()
        }
    }

    #[test]
    fn test_effective_cpc_inherits_from_parent() {
        let parent = Folder {
            cpc: 500,
            children: vec![2, 3],
            ..folder(1)
        };
        let zero_child = folder(2);
        let own_child = Folder {
            cpc: 350,
            ..folder(3)
        };
        let catalog = Catalog::build(rows(vec![parent, zero_child, own_child]), 1).unwrap();

        assert_eq!(catalog.effective_cpc(catalog.folder(2).unwrap()), 500);
        assert_eq!(catalog.effective_cpc(catalog.folder(3).unwrap()), 350);
        assert_eq!(catalog.effective_cpc(catalog.folder(1).unwrap()), 500);
    }

    #[test]
    fn test_orphan_zero_cpc_is_zero() {
        let catalog = Catalog::build(rows(vec![folder(1)]), 1).unwrap();
        assert_eq!(catalog.effective_cpc(catalog.folder(1).unwrap()), 0);
    }

    #[test]
    fn test_links_normalized_both_ways() {
        let parent = Folder {
            children: vec![2],
            ..folder(1)
        };
        let late_child = Folder {
            parent_id: Some(1),
            ..folder(3)
        };
        let catalog = Catalog::build(rows(vec![parent, folder(2), late_child]), 1).unwrap();

        assert_eq!(catalog.folder(2).unwrap().parent_id, Some(1));
        assert_eq!(catalog.folder(1).unwrap().children, vec![2, 3]);
        let roots: Vec<FolderId> = catalog.roots().map(|f| f.id).collect();
        assert_eq!(roots, vec![1]);
    }

    #[test]
    fn test_rejects_dangling_child() {
        let parent = Folder {
            children: vec![42],
            ..folder(1)
        };
        let err = Catalog::build(rows(vec![parent]), 1).unwrap_err();
        assert!(matches!(err, BidderError::InvalidCatalog(_)));
    }

    #[test]
    fn test_rejects_two_parents() {
        let a = Folder {
            children: vec![3],
            ..folder(1)
        };
        let b = Folder {
            children: vec![3],
            ..folder(2)
        };
        let err = Catalog::build(rows(vec![a, b, folder(3)]), 1).unwrap_err();
        assert!(err.to_string().contains("two parents"));
    }

    #[test]
    fn test_rejects_cycle() {
        let a = Folder {
            parent_id: Some(2),
            ..folder(1)
        };
        let b = Folder {
            parent_id: Some(1),
            ..folder(2)
        };
        let err = Catalog::build(rows(vec![a, b]), 1).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = Catalog::build(rows(vec![folder(1), folder(1)]), 1).unwrap_err();
        assert!(err.to_string().contains("duplicate folder"));
    }

    #[test]
    fn test_unknown_owner_and_creative() {
        let f = Folder {
            owner_id: 99,
            creatives: vec![7],
            ..folder(1)
        };
        let catalog = Catalog::build(rows(vec![f]), 1).unwrap();
        let f = catalog.folder(1).unwrap();
        assert!(!catalog.owner_enabled(f.owner_id));
        assert!(!catalog.has_active_creative(f));
        assert!(catalog.owner_enabled(1));
    }
}
