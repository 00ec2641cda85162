//! Purchase ledger contract.
//!
//! Won bids are written to a ledger in batches. The ledger is owned by the caller; this
//! crate only defines the record, the writer trait and the predicate a writer consults
//! before trying again after a failure.

use crate::decision::DecisionSnapshot;
use crate::error::{BidderError, Result};
use crate::types::{CreativeId, DimensionId, FolderId};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Column order of [`PurchaseRecord::to_row`].
pub const PURCHASE_COLUMNS: [&str; 17] = [
    "sale_id",
    "billable",
    "rev_tx",
    "rev_tx_home",
    "rev_ssp",
    "rev_ssp_home",
    "ssp_id",
    "folder_id",
    "creative_id",
    "country_id",
    "vertical_id",
    "brand_id",
    "network_id",
    "subnetwork_id",
    "networktype_id",
    "gender_id",
    "devicetype_id",
];

/// One won impression, keyed by sale, folder, creative and every dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub sale_id: i64,
    pub billable: bool,
    /// Transaction revenue in the sale currency
    pub rev_tx: i64,
    pub rev_tx_home: i64,
    /// Share paid to the seller in the sale currency
    pub rev_ssp: i64,
    pub rev_ssp_home: i64,
    pub ssp_id: i64,
    pub folder_id: FolderId,
    pub creative_id: CreativeId,
    pub country_id: DimensionId,
    pub vertical_id: DimensionId,
    pub brand_id: DimensionId,
    pub network_id: DimensionId,
    pub subnetwork_id: DimensionId,
    pub network_type_id: DimensionId,
    pub gender_id: DimensionId,
    pub device_type_id: DimensionId,
}

impl PurchaseRecord {
    /// Record for a win on a stashed decision.
    ///
    /// `full_price` is the price the decision was made at; the seller's share is that
    /// price minus the stashed margin. Home-currency amounts equal the sale amounts.
    pub fn from_snapshot(
        sale_id: i64,
        ssp_id: i64,
        billable: bool,
        full_price: i64,
        snapshot: &DecisionSnapshot,
    ) -> Self {
        let rev_ssp = full_price - snapshot.margin;
        let dims = &snapshot.dims;
        Self {
            sale_id,
            billable,
            rev_tx: full_price,
            rev_tx_home: full_price,
            rev_ssp,
            rev_ssp_home: rev_ssp,
            ssp_id,
            folder_id: snapshot.folder_id,
            creative_id: snapshot.creative_id,
            country_id: dims.country_id,
            vertical_id: dims.vertical_id,
            brand_id: dims.brand_id,
            network_id: dims.network_id,
            subnetwork_id: dims.subnetwork_id,
            network_type_id: dims.network_type_id,
            gender_id: dims.gender_id,
            device_type_id: dims.device_type_id,
        }
    }

    /// Values in [`PURCHASE_COLUMNS`] order; `billable` is `0` or `1`.
    pub fn to_row(&self) -> [i64; 17] {
        [
            self.sale_id,
            self.billable as i64,
            self.rev_tx,
            self.rev_tx_home,
            self.rev_ssp,
            self.rev_ssp_home,
            self.ssp_id,
            self.folder_id as i64,
            self.creative_id as i64,
            self.country_id as i64,
            self.vertical_id as i64,
            self.brand_id as i64,
            self.network_id as i64,
            self.subnetwork_id as i64,
            self.network_type_id as i64,
            self.gender_id as i64,
            self.device_type_id as i64,
        ]
    }
}

/// Caller-supplied "should I stop retrying?" predicate.
///
/// A ledger writer calls it after every failed attempt with that attempt's error. `true`
/// means give up and drop the batch; `false` means the writer may try again.
pub trait StopRetrying {
    fn should_stop(&self, err: &BidderError) -> bool;
}

impl<F> StopRetrying for F
where
    F: Fn(&BidderError) -> bool,
{
    fn should_stop(&self, err: &BidderError) -> bool {
        self(err)
    }
}

/// Durable sink for purchase batches.
///
/// Implementations own their retry policy and must consult `stop` after each failed
/// attempt. The returned error is the last failure when the batch was given up.
pub trait PurchaseLedger: Send + Sync {
    fn save(&self, batch: &[PurchaseRecord], stop: &dyn StopRetrying) -> Result<()>;
}

/// In-process ledger that makes a single attempt per batch.
///
/// Batches are rejected while a failure is injected. `stop` is consulted once per failure
/// and only decides how the failure is reported; retrying is left to the caller.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<PurchaseRecord>>,
    failure: Mutex<Option<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PurchaseRecord> {
        self.records.lock().clone()
    }

    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.lock() = reason;
    }
}

impl PurchaseLedger for MemoryLedger {
    fn save(&self, batch: &[PurchaseRecord], stop: &dyn StopRetrying) -> Result<()> {
        if let Some(reason) = self.failure.lock().clone() {
            let err = BidderError::CacheIo(format!("purchases: {}", reason));
            if stop.should_stop(&err) {
                warn!("giving up on {} purchases: {}", batch.len(), err);
            } else {
                debug!("{} purchases rejected, caller may retry: {}", batch.len(), err);
            }
            return Err(err);
        }
        self.records.lock().extend_from_slice(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BidRequest, Dimensions};
    use std::cell::Cell;

    fn snapshot() -> DecisionSnapshot {
        DecisionSnapshot {
            folder_id: 12,
            creative_id: 40,
            margin: 10,
            dims: Dimensions {
                country_id: 1,
                vertical_id: 2,
                brand_id: 3,
                network_id: 4,
                subnetwork_id: 5,
                network_type_id: 6,
                gender_id: 7,
                device_type_id: 8,
            },
            request: BidRequest::default(),
        }
    }

    #[test]
    fn test_record_from_snapshot() {
        let record = PurchaseRecord::from_snapshot(99, 2, true, 500, &snapshot());
        assert_eq!(record.rev_tx, 500);
        assert_eq!(record.rev_ssp, 490);
        assert_eq!(record.rev_ssp_home, 490);
        assert_eq!(record.folder_id, 12);
        assert_eq!(record.device_type_id, 8);
    }

    #[test]
    fn test_row_follows_column_order() {
        let row = PurchaseRecord::from_snapshot(99, 2, true, 500, &snapshot()).to_row();
        assert_eq!(row.len(), PURCHASE_COLUMNS.len());
        assert_eq!(row, [99, 1, 500, 500, 490, 490, 2, 12, 40, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_closure_is_a_stop_predicate() {
        let stop_on_miss = |err: &BidderError| matches!(err, BidderError::CacheMiss { .. });
        assert!(stop_on_miss.should_stop(&BidderError::CacheMiss {
            key: "1".to_string()
        }));
        assert!(!stop_on_miss.should_stop(&BidderError::CacheIo("busy".to_string())));
    }

    #[test]
    fn test_memory_ledger_gives_up_when_predicate_says_stop() {
        let ledger = MemoryLedger::new();
        let record = PurchaseRecord::from_snapshot(1, 2, false, 100, &snapshot());
        let asked = Cell::new(0);
        let stop = |_: &BidderError| {
            asked.set(asked.get() + 1);
            true
        };

        ledger.save(&[record.clone()], &stop).unwrap();
        assert_eq!(asked.get(), 0);

        ledger.set_failure(Some("db gone".to_string()));
        assert!(ledger.save(&[record.clone()], &stop).is_err());
        assert_eq!(asked.get(), 1);
        assert_eq!(ledger.records(), vec![record]);
    }

    #[test]
    fn test_memory_ledger_single_attempt_when_predicate_allows_retry() {
        let ledger = MemoryLedger::new();
        let record = PurchaseRecord::from_snapshot(1, 2, false, 100, &snapshot());
        ledger.set_failure(Some("db gone".to_string()));

        let asked = Cell::new(0);
        let keep_going = |_: &BidderError| {
            asked.set(asked.get() + 1);
            false
        };
        let err = ledger.save(&[record.clone()], &keep_going).unwrap_err();
        assert_eq!(err, BidderError::CacheIo("purchases: db gone".to_string()));
        assert_eq!(asked.get(), 1);
        assert!(ledger.records().is_empty());

        // A retry is the caller's job; the next call succeeds once the store is back.
        ledger.set_failure(None);
        ledger.save(&[record.clone()], &keep_going).unwrap();
        assert_eq!(asked.get(), 1);
        assert_eq!(ledger.records(), vec![record]);
    }
}
