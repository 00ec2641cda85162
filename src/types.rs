//! Core identifiers and request-side types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub type FolderId = u64;
pub type CreativeId = u64;
pub type OwnerId = u64;
/// Numeric id of a targeting value. `0` means "unresolved".
pub type DimensionId = u64;

/// Milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ================================================================================================
// DIMENSIONS
// ================================================================================================

/// Targeting axes a folder can restrict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionKind {
    Vertical,
    Country,
    Brand,
    Network,
    SubNetwork,
    NetworkType,
    Gender,
    DeviceType,
}

impl DimensionKind {
    pub fn all() -> [DimensionKind; 8] {
        [
            DimensionKind::Vertical,
            DimensionKind::Country,
            DimensionKind::Brand,
            DimensionKind::Network,
            DimensionKind::SubNetwork,
            DimensionKind::NetworkType,
            DimensionKind::Gender,
            DimensionKind::DeviceType,
        ]
    }

    /// Parses a dimension type name as stored by the catalog database.
    ///
    /// Names may be namespaced (`App\Models\Country`); only the last
    /// segment is significant.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let last = name.rsplit('\\').next().unwrap_or(name);
        match last {
            "Vertical" => Some(DimensionKind::Vertical),
            "Country" => Some(DimensionKind::Country),
            "Brand" => Some(DimensionKind::Brand),
            "Network" => Some(DimensionKind::Network),
            "SubNetwork" => Some(DimensionKind::SubNetwork),
            "NetworkType" => Some(DimensionKind::NetworkType),
            "Gender" => Some(DimensionKind::Gender),
            "DeviceType" => Some(DimensionKind::DeviceType),
            _ => None,
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DimensionKind::Vertical => "Vertical",
            DimensionKind::Country => "Country",
            DimensionKind::Brand => "Brand",
            DimensionKind::Network => "Network",
            DimensionKind::SubNetwork => "SubNetwork",
            DimensionKind::NetworkType => "NetworkType",
            DimensionKind::Gender => "Gender",
            DimensionKind::DeviceType => "DeviceType",
        };
        write!(f, "{}", name)
    }
}

/// Request dimensions resolved to numeric ids before decisioning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub vertical_id: DimensionId,
    pub brand_id: DimensionId,
    pub network_id: DimensionId,
    pub subnetwork_id: DimensionId,
    pub network_type_id: DimensionId,
    pub device_type_id: DimensionId,
    pub country_id: DimensionId,
    pub gender_id: DimensionId,
}

impl Dimensions {
    /// Resolved id for one axis.
    pub fn get(&self, kind: DimensionKind) -> DimensionId {
        match kind {
            DimensionKind::Vertical => self.vertical_id,
            DimensionKind::Country => self.country_id,
            DimensionKind::Brand => self.brand_id,
            DimensionKind::Network => self.network_id,
            DimensionKind::SubNetwork => self.subnetwork_id,
            DimensionKind::NetworkType => self.network_type_id,
            DimensionKind::Gender => self.gender_id,
            DimensionKind::DeviceType => self.device_type_id,
        }
    }
}

/// Unresolved targeting names as they arrive on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTargeting {
    pub vertical: String,
    pub brand: String,
    pub network: String,
    pub subnetwork: String,
    pub network_type: String,
    pub device_type: String,
    pub country: String,
    pub gender: String,
}

// ================================================================================================
// BID REQUEST
// ================================================================================================

/// One impression line of a bid request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impression {
    pub id: String,
    pub bid_floor: i64,
}

/// The parts of a bid request the engine reads.
///
/// The random byte is supplied by the envelope; the engine never draws it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRequest {
    /// Uniform random byte, any value in `0..=255`
    pub random255: u8,
    pub test: bool,
    pub impressions: Vec<Impression>,
    pub dims: Dimensions,
    /// Names the dimensions were resolved from, kept for auditing
    #[serde(default)]
    pub targeting: NamedTargeting,
}

impl BidRequest {
    /// Bid floor of the first impression line, if the request has one.
    pub fn bid_floor(&self) -> Option<i64> {
        self.impressions.first().map(|imp| imp.bid_floor)
    }
}
