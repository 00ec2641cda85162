//! Name ↔ id reference tables for targeting values.

use crate::types::{DimensionId, Dimensions, NamedTargeting};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Bidirectional name/id table for one namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    by_name: HashMap<String, DimensionId>,
    by_id: HashMap<DimensionId, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: DimensionId, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), id);
        self.by_id.insert(id, name);
    }

    pub fn id_of(&self, name: &str) -> Option<DimensionId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: DimensionId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl<'a> FromIterator<(DimensionId, &'a str)> for NameTable {
    fn from_iter<I: IntoIterator<Item = (DimensionId, &'a str)>>(iter: I) -> Self {
        let mut table = NameTable::new();
        for (id, name) in iter {
            table.insert(id, name);
        }
        table
    }
}

/// `(channel, label)` key of a subchannel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subchannel {
    pub channel_id: DimensionId,
    pub label: String,
}

const FIXED_DEVICE_TYPES: [(DimensionId, &str); 4] =
    [(1, "desktop"), (2, "mobile"), (3, "tablet"), (4, "unknown")];
const FIXED_GENDERS: [(DimensionId, &str); 2] = [(1, "male"), (2, "female")];

fn merge_fixed<'de, D: Deserializer<'de>>(
    deserializer: D,
    fixed: &[(DimensionId, &str)],
) -> Result<NameTable, D::Error> {
    let mut table = NameTable::deserialize(deserializer)?;
    for (id, name) in fixed {
        table.insert(*id, *name);
    }
    Ok(table)
}

fn with_fixed_device_types<'de, D: Deserializer<'de>>(d: D) -> Result<NameTable, D::Error> {
    merge_fixed(d, &FIXED_DEVICE_TYPES)
}

fn with_fixed_genders<'de, D: Deserializer<'de>>(d: D) -> Result<NameTable, D::Error> {
    merge_fixed(d, &FIXED_GENDERS)
}

/// Read-only reference data shipped with every catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pseudonyms {
    pub countries: NameTable,
    pub networks: NameTable,
    pub network_types: NameTable,
    pub subnetworks: NameTable,
    pub subnetwork_labels: NameTable,
    pub brands: NameTable,
    pub brand_slugs: NameTable,
    pub verticals: NameTable,
    /// Always holds the fixed device types, whatever the source supplies
    #[serde(deserialize_with = "with_fixed_device_types")]
    pub device_types: NameTable,
    /// Always holds the fixed genders, whatever the source supplies
    #[serde(deserialize_with = "with_fixed_genders")]
    pub genders: NameTable,
    pub subnetwork_to_network: HashMap<DimensionId, DimensionId>,
    pub network_to_network_type: HashMap<DimensionId, DimensionId>,
    /// Serialized as pairs; JSON maps cannot have struct keys
    #[serde(with = "subchannel_pairs")]
    pub subchannels: HashMap<Subchannel, DimensionId>,
}

impl Default for Pseudonyms {
    fn default() -> Self {
        Pseudonyms {
            countries: NameTable::new(),
            networks: NameTable::new(),
            network_types: NameTable::new(),
            subnetworks: NameTable::new(),
            subnetwork_labels: NameTable::new(),
            brands: NameTable::new(),
            brand_slugs: NameTable::new(),
            verticals: NameTable::new(),
            device_types: FIXED_DEVICE_TYPES.into_iter().collect(),
            genders: FIXED_GENDERS.into_iter().collect(),
            subnetwork_to_network: HashMap::new(),
            network_to_network_type: HashMap::new(),
            subchannels: HashMap::new(),
        }
    }
}

impl Pseudonyms {
    pub fn subchannel_id(&self, channel_id: DimensionId, label: &str) -> Option<DimensionId> {
        self.subchannels
            .get(&Subchannel {
                channel_id,
                label: label.to_string(),
            })
            .copied()
    }

    /// Resolves request names to ids. Unknown names resolve to `0`.
    ///
    /// A missing network falls back to the subnetwork's parent network, and a
    /// missing network type to the network's type.
    pub fn resolve(&self, names: &NamedTargeting) -> Dimensions {
        let lookup = |table: &NameTable, name: &str| table.id_of(name).unwrap_or(0);

        let subnetwork_id = lookup(&self.subnetworks, &names.subnetwork);
        let mut network_id = lookup(&self.networks, &names.network);
        if network_id == 0 {
            network_id = self
                .subnetwork_to_network
                .get(&subnetwork_id)
                .copied()
                .unwrap_or(0);
        }
        let mut network_type_id = lookup(&self.network_types, &names.network_type);
        if network_type_id == 0 {
            network_type_id = self
                .network_to_network_type
                .get(&network_id)
                .copied()
                .unwrap_or(0);
        }

        Dimensions {
            vertical_id: lookup(&self.verticals, &names.vertical),
            brand_id: self
                .brands
                .id_of(&names.brand)
                .or_else(|| self.brand_slugs.id_of(&names.brand))
                .unwrap_or(0),
            network_id,
            subnetwork_id,
            network_type_id,
            device_type_id: lookup(&self.device_types, &names.device_type),
            country_id: lookup(&self.countries, &names.country),
            gender_id: lookup(&self.genders, &names.gender),
        }
    }
}

mod subchannel_pairs {
    use super::Subchannel;
    use crate::types::DimensionId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        map: &HashMap<Subchannel, DimensionId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&Subchannel, &DimensionId)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<Subchannel, DimensionId>, D::Error> {
        let pairs: Vec<(Subchannel, DimensionId)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
