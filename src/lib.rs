//! # Bidder
//!
//! Real-time bid decisions over a hot-swappable demand catalog.
//!
//! - **catalog**: folder forest, creatives, owners, name tables and their loaders
//! - **runtime**: publishes catalog snapshots and hot-reloads them
//! - **eligibility**: check ladder over the folder forest
//! - **selection** / **decision**: pluggable choice among eligible folders, then pricing
//! - **engine**: one decision per request, panics contained
//! - **cache**: sharded write-once stores and recall handles for decision snapshots
//! - **refresh**: on-demand and scheduled catalog reloads
//! - **ledger**: purchase record and retry predicate contract
//! - **telemetry**: decision counters and the important-message ring

pub mod cache;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod refresh;
pub mod runtime;
pub mod selection;
pub mod telemetry;
pub mod types;

pub use cache::{CacheStore, RecallStore, ShardRouter};
pub use catalog::{Catalog, CatalogLoader, CatalogRows};
pub use config::EngineConfig;
pub use decision::{Decision, DecisionSnapshot};
pub use engine::BidEngine;
pub use error::{BidderError, Result};
pub use runtime::{RuntimeManager, RuntimeState};
pub use selection::{BiddingPolicy, UniformPolicy};
pub use types::{BidRequest, Dimensions, Impression};
