//! Catalog refresh.
//!
//! 1. **On-demand refresh** (RefreshService): one reload, reported as stats
//! 2. **Scheduled refresh** (RefreshScheduler): periodic background task (5-minute default)

pub mod scheduler;
pub mod service;

pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use service::{RefreshService, RefreshStats};
