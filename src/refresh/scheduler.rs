//! Scheduled catalog refresh - background task for periodic reloading.
//!
//! The catalog source can change at any time and nothing pushes those changes to the
//! bidder, so the scheduler reloads on a fixed interval. A failed reload is logged and
//! the stale catalog keeps serving until the next tick succeeds.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use super::{RefreshService, RefreshStats};
use crate::error::Result;
use crate::telemetry::ImportantLog;
use crate::types::now_ms;
use log::{error, info};

/// Configuration for the scheduled refresh service.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between refresh operations
    pub refresh_interval: Duration,
    /// Whether the scheduler is enabled
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5 * 60),
            enabled: true,
        }
    }
}

/// Scheduler for periodic catalog refresh.
///
/// Runs as a background task spawned during server initialization.
pub struct RefreshScheduler {
    service: RefreshService,
    config: SchedulerConfig,
    /// Timestamp of the last successful refresh, `0` before the first one
    last_refresh_at: RwLock<u64>,
    failures: AtomicU64,
    important: Option<Arc<ImportantLog>>,
}

impl RefreshScheduler {
    pub fn new(service: RefreshService, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            last_refresh_at: RwLock::new(0),
            failures: AtomicU64::new(0),
            important: None,
        }
    }

    /// Also report refresh failures to `important`.
    pub fn with_important_log(mut self, important: Arc<ImportantLog>) -> Self {
        self.important = Some(important);
        self
    }

    /// Milliseconds since UNIX epoch of the last successful refresh.
    pub fn last_refresh(&self) -> u64 {
        *self.last_refresh_at.read()
    }

    /// Failed refreshes since the scheduler was created.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Starts the scheduler background task.
    ///
    /// Runs forever when enabled; returns immediately when disabled. The first tick
    /// waits a full interval, since the server performs its own initial reload.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use bidder::refresh::RefreshScheduler;
    /// # async fn spawn(scheduler: Arc<RefreshScheduler>) {
    /// tokio::spawn(async move {
    ///     scheduler.start().await;
    /// });
    /// # }
    /// ```
    pub async fn start(self: Arc<Self>) {
        if !self.config.enabled {
            info!("Scheduled refresh is disabled, skipping");
            return;
        }

        info!(
            "Starting scheduled refresh with {}-second interval",
            self.config.refresh_interval.as_secs()
        );

        let mut ticker = interval(self.config.refresh_interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let _ = self.do_refresh();
        }
    }

    /// Executes one refresh cycle. Errors are logged and returned, never raised.
    pub fn do_refresh(&self) -> Result<RefreshStats> {
        match self.service.refresh() {
            Ok(stats) => {
                info!(
                    "Scheduled refresh completed: catalog v{} with {} folders in {}ms",
                    stats.version, stats.folders_loaded, stats.duration_ms
                );
                *self.last_refresh_at.write() = now_ms();
                Ok(stats)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!("Scheduled refresh failed: {}", e);
                if let Some(important) = &self.important {
                    important.push(format!("scheduled refresh failed: {}", e));
                }
                Err(e)
            }
        }
    }
}
