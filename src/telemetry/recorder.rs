//! # Decision Recorder
//!
//! Thread-safe counters of decision outcomes.

use parking_lot::RwLock;

/// How a single decision ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    Bid,
    NoBid,
    Aborted,
}

#[derive(Debug, Default)]
pub struct DecisionRecorder {
    total_decisions: RwLock<u64>,
    bids: RwLock<u64>,
    no_bids: RwLock<u64>,
    aborted: RwLock<u64>,
}

impl DecisionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: DecisionOutcome) {
        *self.total_decisions.write() += 1;
        match outcome {
            DecisionOutcome::Bid => *self.bids.write() += 1,
            DecisionOutcome::NoBid => *self.no_bids.write() += 1,
            DecisionOutcome::Aborted => *self.aborted.write() += 1,
        }
    }

    pub fn stats(&self) -> DecisionStats {
        DecisionStats {
            total_decisions: *self.total_decisions.read(),
            bids: *self.bids.read(),
            no_bids: *self.no_bids.read(),
            aborted: *self.aborted.read(),
        }
    }
}

/// Point-in-time copy of the recorder's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionStats {
    pub total_decisions: u64,
    pub bids: u64,
    pub no_bids: u64,
    pub aborted: u64,
}

impl DecisionStats {
    pub fn bid_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.bids as f64 / self.total_decisions as f64
        }
    }
}
