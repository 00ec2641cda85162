//! Catalog entities: folders, creatives and owners.

use crate::types::{CreativeId, DimensionId, DimensionKind, FolderId, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Set of allowed ids for one targeting axis.
///
/// An empty set is a wildcard and matches every value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSet(BTreeSet<DimensionId>);

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: DimensionId) {
        self.0.insert(id);
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn matches(&self, id: DimensionId) -> bool {
        self.0.is_empty() || self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionId> {
        self.0.iter()
    }
}

impl<const N: usize> From<[DimensionId; N]> for TargetSet {
    fn from(ids: [DimensionId; N]) -> Self {
        TargetSet(ids.into_iter().collect())
    }
}

impl FromIterator<DimensionId> for TargetSet {
    fn from_iter<I: IntoIterator<Item = DimensionId>>(iter: I) -> Self {
        TargetSet(iter.into_iter().collect())
    }
}

/// Per-axis targeting of a folder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub vertical: TargetSet,
    pub country: TargetSet,
    pub brand: TargetSet,
    pub network: TargetSet,
    pub subnetwork: TargetSet,
    pub network_type: TargetSet,
    pub gender: TargetSet,
    pub device_type: TargetSet,
}

impl Targets {
    pub fn get(&self, kind: DimensionKind) -> &TargetSet {
        match kind {
            DimensionKind::Vertical => &self.vertical,
            DimensionKind::Country => &self.country,
            DimensionKind::Brand => &self.brand,
            DimensionKind::Network => &self.network,
            DimensionKind::SubNetwork => &self.subnetwork,
            DimensionKind::NetworkType => &self.network_type,
            DimensionKind::Gender => &self.gender,
            DimensionKind::DeviceType => &self.device_type,
        }
    }

    pub fn get_mut(&mut self, kind: DimensionKind) -> &mut TargetSet {
        match kind {
            DimensionKind::Vertical => &mut self.vertical,
            DimensionKind::Country => &mut self.country,
            DimensionKind::Brand => &mut self.brand,
            DimensionKind::Network => &mut self.network,
            DimensionKind::SubNetwork => &mut self.subnetwork,
            DimensionKind::NetworkType => &mut self.network_type,
            DimensionKind::Gender => &mut self.gender,
            DimensionKind::DeviceType => &mut self.device_type,
        }
    }
}

/// A targeting/demand unit in the folder forest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub id: FolderId,
    pub parent_id: Option<FolderId>,
    pub children: Vec<FolderId>,
    pub active: bool,
    pub owner_id: OwnerId,
    /// Own bid amount; `0` defers to the parent
    pub cpc: i64,
    pub budget: i64,
    pub creatives: Vec<CreativeId>,
    pub targets: Targets,
}

impl Folder {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Adds a targeting row given its stored type name.
    pub fn assign_target(&mut self, type_name: &str, value: DimensionId) -> Result<(), String> {
        let kind = DimensionKind::from_type_name(type_name)
            .ok_or_else(|| format!("unknown dimension type: {}", type_name))?;
        self.targets.get_mut(kind).insert(value);
        Ok(())
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "folder {} (children {}, cpc {}, creatives {})",
            self.id,
            self.children.len(),
            self.cpc,
            self.creatives.len()
        )
    }
}

/// A deliverable ad asset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creative {
    pub id: CreativeId,
    pub redirect_url: String,
    pub active: bool,
}

/// Account owning folders. Any non-zero status disables all of its folders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub status: i64,
}

impl Owner {
    pub fn is_enabled(&self) -> bool {
        self.status == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_target_set_is_wildcard() {
        let set = TargetSet::new();
        assert!(set.is_wildcard());
        assert!(set.matches(0));
        assert!(set.matches(9999));
    }

    #[test]
    fn test_target_set_membership() {
        let set = TargetSet::from([1, 2]);
        assert!(set.matches(2));
        assert!(!set.matches(3));
    }

    #[test]
    fn test_assign_target_rows() {
        let mut folder = Folder::default();
        folder.assign_target("App\\Models\\Network", 1).unwrap();
        folder.assign_target("Network", 2).unwrap();
        assert_eq!(folder.targets.network, TargetSet::from([1, 2]));

        let err = folder.assign_target("Planet", 4).unwrap_err();
        assert!(err.contains("Planet"));
    }
}
