//! Bid decisions and pricing.

use crate::catalog::Catalog;
use crate::types::{BidRequest, CreativeId, Dimensions, FolderId};
use log::debug;
use serde::{Deserialize, Serialize};

/// Auditable record of a chosen bid, stashed for later correlation with a win notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    pub folder_id: FolderId,
    pub creative_id: CreativeId,
    pub margin: i64,
    pub dims: Dimensions,
    pub request: BidRequest,
}

/// Outcome of one bid decision.
///
/// `folder_id == None` is a no-bid. It is a normal business outcome, not an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decision {
    pub folder_id: Option<FolderId>,
    pub creative_id: Option<CreativeId>,
    /// Effective CPC of the chosen folder
    pub full_price: i64,
    pub margin: i64,
    pub offered_price: i64,
    pub redirect_url: Option<String>,
    pub snapshot: Option<DecisionSnapshot>,
    /// Catalog version the decision was made against, `0` when none was live
    pub catalog_version: u64,
    /// Set when the decision was abandoned after a panic
    pub aborted: Option<String>,
}

impl Decision {
    pub fn no_bid(catalog_version: u64) -> Self {
        Self {
            catalog_version,
            ..Default::default()
        }
    }

    pub fn aborted(catalog_version: u64, reason: String) -> Self {
        Self {
            catalog_version,
            aborted: Some(reason),
            ..Default::default()
        }
    }

    pub fn is_bid(&self) -> bool {
        self.folder_id.is_some() && self.aborted.is_none()
    }
}

/// Splits `full_price` by `revshare` percent.
///
/// Returns `(margin, offered_price)` where the offered price is the floor of the
/// seller's share and the margin is the remainder.
pub fn split_price(full_price: i64, revshare: f64) -> (i64, i64) {
    let revshare = revshare.clamp(0.0, 100.0);
    let price = full_price as f64 * revshare / 100.0;
    let margin = full_price - price.floor() as i64;
    (margin, full_price - margin)
}

/// Prices a selected decision and attaches its audit snapshot.
///
/// Does nothing for a no-bid.
pub fn apply_pricing(decision: &mut Decision, revshare: f64, catalog: &Catalog, request: &BidRequest) {
    let (folder_id, creative_id) = match (decision.folder_id, decision.creative_id) {
        (Some(folder_id), Some(creative_id)) => (folder_id, creative_id),
        _ => return,
    };

    let (margin, offered_price) = split_price(decision.full_price, revshare);
    debug!(
        "rev calculated at {:.2}: full {} margin {} offered {}",
        revshare, decision.full_price, margin, offered_price
    );

    decision.margin = margin;
    decision.offered_price = offered_price;
    decision.redirect_url = catalog
        .creative(creative_id)
        .map(|creative| creative.redirect_url.clone());
    decision.snapshot = Some(DecisionSnapshot {
        folder_id,
        creative_id,
        margin,
        dims: request.dims,
        request: request.clone(),
    });
}
