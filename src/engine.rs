//! Bid engine - one decision per request against a single catalog snapshot.
//!
//! A decision runs filter, select and price against the catalog published when it
//! started. A panic anywhere inside those steps is caught here, logged, and the
//! decision comes back aborted instead of unwinding into the caller.

use crate::cache::{CacheStore, RecallStore};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::decision::{apply_pricing, Decision, DecisionSnapshot};
use crate::eligibility::{find_eligible, FilterInput};
use crate::error::{BidderError, Result};
use crate::runtime::RuntimeManager;
use crate::selection::{BiddingPolicy, UniformPolicy};
use crate::telemetry::{DecisionOutcome, DecisionRecorder, DecisionStats};
use crate::types::BidRequest;
use log::{debug, error};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct BidEngine {
    runtime: Arc<RuntimeManager>,
    policy: Box<dyn BiddingPolicy>,
    config: EngineConfig,
    recorder: DecisionRecorder,
    recall: Option<RecallStore<Box<dyn CacheStore>>>,
}

impl std::fmt::Debug for BidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidEngine")
            .field("runtime", &self.runtime)
            .field("policy", &self.policy.name())
            .field("recall", &self.recall.as_ref().map(|r| r.store().describe()))
            .finish()
    }
}

impl BidEngine {
    /// Engine with the uniform policy at the configured revshare.
    pub fn new(runtime: Arc<RuntimeManager>, config: EngineConfig) -> Self {
        let policy = UniformPolicy {
            revshare: config.revshare_percent,
        };
        Self::with_policy(runtime, Box::new(policy), config)
    }

    pub fn with_policy(
        runtime: Arc<RuntimeManager>,
        policy: Box<dyn BiddingPolicy>,
        config: EngineConfig,
    ) -> Self {
        Self {
            runtime,
            policy,
            config,
            recorder: DecisionRecorder::new(),
            recall: None,
        }
    }

    /// Enables [`stash`](Self::stash) and [`recall`](Self::recall) on top of `store`.
    pub fn with_recall_store(mut self, store: Box<dyn CacheStore>) -> Self {
        self.recall = Some(RecallStore::with_attempts(store, self.config.id_attempts));
        self
    }

    pub fn runtime(&self) -> &Arc<RuntimeManager> {
        &self.runtime
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn stats(&self) -> DecisionStats {
        self.recorder.stats()
    }

    pub fn reload(&self) -> Result<Arc<Catalog>> {
        self.runtime.reload()
    }

    /// Decides whether and how to bid on `request`.
    ///
    /// Never fails: no catalog, no impression lines and no eligible folder all
    /// produce a no-bid, and a panic produces an aborted decision.
    pub fn decide(&self, request: &BidRequest) -> Decision {
        let catalog = match self.runtime.snapshot() {
            Some(catalog) => catalog,
            None => {
                debug!("no catalog published, not bidding");
                self.recorder.record(DecisionOutcome::NoBid);
                return Decision::no_bid(0);
            }
        };
        let version = catalog.version();

        let decision = match catch_unwind(AssertUnwindSafe(|| self.decide_with(&catalog, request))) {
            Ok(decision) => decision,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("decision against catalog v{} aborted: {}", version, reason);
                Decision::aborted(version, reason)
            }
        };

        self.recorder.record(if decision.aborted.is_some() {
            DecisionOutcome::Aborted
        } else if decision.is_bid() {
            DecisionOutcome::Bid
        } else {
            DecisionOutcome::NoBid
        });
        decision
    }

    fn decide_with(&self, catalog: &Catalog, request: &BidRequest) -> Decision {
        let version = catalog.version();
        let bid_floor = match request.bid_floor() {
            Some(bid_floor) => bid_floor,
            None => {
                debug!("request has no impression lines, not bidding");
                return Decision::no_bid(version);
            }
        };

        let input = FilterInput {
            dims: &request.dims,
            bid_floor,
            test_mode: request.test || self.config.test_only,
        };
        let eligibility = find_eligible(catalog, &input);
        if eligibility.is_empty() {
            debug!("no eligible folders, not bidding");
            return Decision::no_bid(version);
        }

        let mut decision = Decision::no_bid(version);
        self.policy.select_folder_and_creative(
            &mut decision,
            catalog,
            request,
            &eligibility.folders,
            eligibility.total_cpc,
        );
        let revshare = self.policy.calculate_revshare(&decision);
        apply_pricing(&mut decision, revshare, catalog, request);
        decision
    }

    /// Stores the snapshot of a bid and returns its recall handle.
    ///
    /// A no-bid has nothing to stash and yields `Ok(None)`.
    pub fn stash(&self, decision: &Decision) -> Result<Option<u64>> {
        let snapshot = match &decision.snapshot {
            Some(snapshot) if decision.is_bid() => snapshot,
            _ => return Ok(None),
        };
        self.recall_store()?.save(snapshot).map(Some)
    }

    pub fn recall(&self, handle: u64) -> Result<DecisionSnapshot> {
        self.recall_store()?.fetch(handle)
    }

    fn recall_store(&self) -> Result<&RecallStore<Box<dyn CacheStore>>> {
        self.recall
            .as_ref()
            .ok_or_else(|| BidderError::Config("no recall store configured".to_string()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
