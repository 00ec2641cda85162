//! Selection policies - choose one eligible folder and creative, and set the revshare.

use crate::catalog::Catalog;
use crate::decision::Decision;
use crate::eligibility::EligibleFolder;
use crate::types::BidRequest;
use log::info;

/// Pluggable choice among eligible folders.
///
/// # Contract
/// - `select_folder_and_creative` is only called with a non-empty `eligible` list and
///   must set `folder_id`, `creative_id` and `full_price` on the decision.
/// - `calculate_revshare` returns the percentage of the full price offered to the
///   seller. Values above 100 are clamped by the pricing step.
/// - Neither operation may perform I/O.
pub trait BiddingPolicy: Send + Sync {
    fn select_folder_and_creative(
        &self,
        decision: &mut Decision,
        catalog: &Catalog,
        request: &BidRequest,
        eligible: &[EligibleFolder],
        total_cpc: i64,
    );

    fn calculate_revshare(&self, decision: &Decision) -> f64;

    fn name(&self) -> &'static str;
}

/// Default policy: uniform pick driven by the request's random byte.
///
/// The folder is `eligible[random % len]`, independent of CPC, so `total_cpc` is
/// ignored. The creative is indexed the same way within the chosen folder's list
/// without re-checking its active flag; eligibility only guarantees that some
/// creative in the folder is active.
#[derive(Debug, Clone, Copy)]
pub struct UniformPolicy {
    pub revshare: f64,
}

impl Default for UniformPolicy {
    fn default() -> Self {
        Self { revshare: 98.0 }
    }
}

impl BiddingPolicy for UniformPolicy {
    fn select_folder_and_creative(
        &self,
        decision: &mut Decision,
        catalog: &Catalog,
        request: &BidRequest,
        eligible: &[EligibleFolder],
        _total_cpc: i64,
    ) {
        let random = request.random255 as usize;
        let picked = eligible[random % eligible.len()];

        info!(
            "folders {} to choose from, picked {}",
            eligible
                .iter()
                .map(|f| f.folder_id.to_string())
                .collect::<Vec<_>>()
                .join(","),
            picked.folder_id
        );

        decision.folder_id = Some(picked.folder_id);
        decision.full_price = picked.bid_amount;
        decision.creative_id = catalog
            .folder(picked.folder_id)
            .filter(|folder| !folder.creatives.is_empty())
            .map(|folder| folder.creatives[random % folder.creatives.len()]);
    }

    fn calculate_revshare(&self, _decision: &Decision) -> f64 {
        self.revshare
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}
