//! Eligibility filter - walks the folder forest and collects biddable folders.
//!
//! Each folder runs through a fixed ladder of independent checks, stopping at the
//! first failure:
//!
//! | # | Check        | Notes                                   |
//! |---|--------------|-----------------------------------------|
//! | 1 | Active       | folder flag                             |
//! | 2 | OwnerStatus  | owner status must be `0`                |
//! | 3 | Country      | skipped entirely in test mode           |
//! | 4 | Brand        |                                         |
//! | 5 | Network      |                                         |
//! | 6 | NetworkType  |                                         |
//! | 7 | SubNetwork   |                                         |
//! | 8 | Gender       |                                         |
//! | 9 | DeviceType   |                                         |
//! |10 | Vertical     |                                         |
//! |11 | Cpc          | effective CPC must reach the bid floor  |
//!
//! Target checks pass when the folder's set for that axis is empty.
//!
//! Only root folders are scanned directly. A root that passes the ladder has its
//! direct children evaluated through the same ladder; children do not inherit the
//! parent's targeting, only its CPC.

use crate::catalog::{Catalog, Folder};
use crate::types::{DimensionKind, Dimensions, FolderId};
use log::debug;
use std::fmt;

/// What the filter needs to know about a request.
#[derive(Clone, Copy, Debug)]
pub struct FilterInput<'a> {
    pub dims: &'a Dimensions,
    pub bid_floor: i64,
    pub test_mode: bool,
}

/// Why a folder was not eligible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Inactive,
    OwnerStatus,
    Target(DimensionKind),
    Cpc,
    NoActiveCreative,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Inactive => write!(f, "Inactive"),
            Rejection::OwnerStatus => write!(f, "OwnerStatus"),
            Rejection::Target(kind) => write!(f, "{}", kind),
            Rejection::Cpc => write!(f, "CPC"),
            Rejection::NoActiveCreative => write!(f, "NoActiveCreative"),
        }
    }
}

/// A folder that passed every check, with the CPC it bids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EligibleFolder {
    pub folder_id: FolderId,
    pub bid_amount: i64,
}

/// Output of one filter pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eligibility {
    /// Eligible folders in catalog iteration order
    pub folders: Vec<EligibleFolder>,
    /// Sum of `bid_amount` over `folders`
    pub total_cpc: i64,
}

impl Eligibility {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

// ================================================================================================
// CHECK LADDER
// ================================================================================================

type Check = fn(&Catalog, &Folder, &FilterInput<'_>) -> bool;

#[inline]
fn target_matches(folder: &Folder, input: &FilterInput<'_>, kind: DimensionKind) -> bool {
    folder.targets.get(kind).matches(input.dims.get(kind))
}

fn check_active(_: &Catalog, folder: &Folder, _: &FilterInput<'_>) -> bool {
    folder.active
}

fn check_owner(catalog: &Catalog, folder: &Folder, _: &FilterInput<'_>) -> bool {
    catalog.owner_enabled(folder.owner_id)
}

fn check_country(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    input.test_mode || target_matches(folder, input, DimensionKind::Country)
}

fn check_brand(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::Brand)
}

fn check_network(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::Network)
}

fn check_network_type(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::NetworkType)
}

fn check_subnetwork(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::SubNetwork)
}

fn check_gender(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::Gender)
}

fn check_device_type(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::DeviceType)
}

fn check_vertical(_: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    target_matches(folder, input, DimensionKind::Vertical)
}

fn check_bid_floor(catalog: &Catalog, folder: &Folder, input: &FilterInput<'_>) -> bool {
    catalog.effective_cpc(folder) >= input.bid_floor
}

/// Evaluated in order; the first failing entry names the rejection.
const LADDER: [(Rejection, Check); 11] = [
    (Rejection::Inactive, check_active),
    (Rejection::OwnerStatus, check_owner),
    (Rejection::Target(DimensionKind::Country), check_country),
    (Rejection::Target(DimensionKind::Brand), check_brand),
    (Rejection::Target(DimensionKind::Network), check_network),
    (Rejection::Target(DimensionKind::NetworkType), check_network_type),
    (Rejection::Target(DimensionKind::SubNetwork), check_subnetwork),
    (Rejection::Target(DimensionKind::Gender), check_gender),
    (Rejection::Target(DimensionKind::DeviceType), check_device_type),
    (Rejection::Target(DimensionKind::Vertical), check_vertical),
    (Rejection::Cpc, check_bid_floor),
];

/// Runs the check ladder for one folder.
pub fn run_ladder(
    catalog: &Catalog,
    folder: &Folder,
    input: &FilterInput<'_>,
) -> Result<(), Rejection> {
    for (rejection, check) in LADDER.iter() {
        if !check(catalog, folder, input) {
            return Err(*rejection);
        }
    }
    Ok(())
}

/// Full eligibility of one folder: the ladder plus at least one active creative.
///
/// Returns the folder's effective CPC when eligible.
pub fn evaluate_folder(
    catalog: &Catalog,
    folder: &Folder,
    input: &FilterInput<'_>,
) -> Result<i64, Rejection> {
    run_ladder(catalog, folder, input)?;
    if !catalog.has_active_creative(folder) {
        return Err(Rejection::NoActiveCreative);
    }
    Ok(catalog.effective_cpc(folder))
}

// ================================================================================================
// TRAVERSAL
// ================================================================================================

/// Collects every eligible folder for a request.
pub fn find_eligible(catalog: &Catalog, input: &FilterInput<'_>) -> Eligibility {
    let mut result = Eligibility::default();

    // Returns whether the folder passed the ladder; children are gated on that,
    // not on the folder having an active creative.
    let mut visit = |folder: &Folder| -> bool {
        if let Err(rejection) = run_ladder(catalog, folder, input) {
            debug!("folder {} doesn't match: {}", folder.id, rejection);
            return false;
        }
        if !catalog.has_active_creative(folder) {
            debug!("folder {} matches but has no active creative", folder.id);
            return true;
        }

        let bid_amount = catalog.effective_cpc(folder);
        debug!("folder {} matches at cpc {}", folder.id, bid_amount);
        result.total_cpc += bid_amount;
        result.folders.push(EligibleFolder {
            folder_id: folder.id,
            bid_amount,
        });
        true
    };

    for root in catalog.roots() {
        if !visit(root) {
            continue;
        }
        for child in catalog.children(root) {
            visit(child);
        }
    }

    result
}
