//! # Telemetry
//!
//! - **important_log**: bounded ring of operator-facing messages, flushed on demand
//! - **recorder**: decision outcome counters

pub mod important_log;
pub mod recorder;

pub use important_log::ImportantLog;
pub use recorder::{DecisionOutcome, DecisionRecorder, DecisionStats};
