//! Engine configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to its default.

use crate::cache::ID_ATTEMPTS;
use crate::error::{BidderError, Result};
use crate::refresh::SchedulerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Treat every request as a test request (country targeting ignored)
    pub test_only: bool,
    /// Percentage of the full price offered to the seller
    pub revshare_percent: f64,
    /// Attempts the recall handle issuer makes before giving up
    pub id_attempts: usize,
    /// Number of in-memory recall shards when no database is configured
    pub shard_count: usize,
    pub refresh: SchedulerConfig,
    pub important_log_capacity: usize,
    pub important_log_interval: Duration,
    /// File the important log is appended to on flush
    pub important_log_path: Option<PathBuf>,
    /// Catalog snapshot kept next to the primary source, used when it fails
    pub snapshot_path: Option<PathBuf>,
    /// SQLite database that backs recall handles across restarts
    pub recall_db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            test_only: false,
            revshare_percent: 98.0,
            id_attempts: ID_ATTEMPTS,
            shard_count: 4,
            refresh: SchedulerConfig::default(),
            important_log_capacity: 20,
            important_log_interval: Duration::from_secs(60),
            important_log_path: None,
            snapshot_path: None,
            recall_db_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BidderError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)
            .map_err(|e| BidderError::Config(format!("Failed to parse config: {}", e)))?;
        let config = Self::from(file);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.revshare_percent.is_finite() || self.revshare_percent < 0.0 {
            return Err(BidderError::Config(format!(
                "revshare_percent must be a non-negative number, got {}",
                self.revshare_percent
            )));
        }
        if self.id_attempts == 0 {
            return Err(BidderError::Config("id_attempts must be at least 1".to_string()));
        }
        if self.shard_count == 0 {
            return Err(BidderError::Config("shard_count must be at least 1".to_string()));
        }
        if self.important_log_capacity == 0 {
            return Err(BidderError::Config(
                "important_log_capacity must be at least 1".to_string(),
            ));
        }
        if self.refresh.enabled && self.refresh.refresh_interval.is_zero() {
            return Err(BidderError::Config(
                "refresh interval must be positive when refresh is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// On-disk layout.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    test_only: bool,
    revshare_percent: f64,
    id_attempts: usize,
    shard_count: usize,
    refresh_enabled: bool,
    refresh_interval_secs: u64,
    important_log_capacity: usize,
    important_log_interval_secs: u64,
    important_log_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    recall_db_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            test_only: defaults.test_only,
            revshare_percent: defaults.revshare_percent,
            id_attempts: defaults.id_attempts,
            shard_count: defaults.shard_count,
            refresh_enabled: defaults.refresh.enabled,
            refresh_interval_secs: defaults.refresh.refresh_interval.as_secs(),
            important_log_capacity: defaults.important_log_capacity,
            important_log_interval_secs: defaults.important_log_interval.as_secs(),
            important_log_path: None,
            snapshot_path: None,
            recall_db_path: None,
        }
    }
}

impl From<ConfigFile> for EngineConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            test_only: file.test_only,
            revshare_percent: file.revshare_percent,
            id_attempts: file.id_attempts,
            shard_count: file.shard_count,
            refresh: SchedulerConfig {
                refresh_interval: Duration::from_secs(file.refresh_interval_secs),
                enabled: file.refresh_enabled,
            },
            important_log_capacity: file.important_log_capacity,
            important_log_interval: Duration::from_secs(file.important_log_interval_secs),
            important_log_path: file.important_log_path,
            snapshot_path: file.snapshot_path,
            recall_db_path: file.recall_db_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.test_only);
        assert_eq!(config.revshare_percent, 98.0);
        assert_eq!(config.id_attempts, 7);
        assert_eq!(config.important_log_capacity, 20);
        assert_eq!(config.refresh.refresh_interval.as_secs(), 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config.revshare_percent, 98.0);
        assert_eq!(config.shard_count, 4);
        assert!(config.recall_db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{
                "test_only": true,
                "revshare_percent": 90.5,
                "refresh_interval_secs": 30,
                "recall_db_path": "/tmp/recalls.db"
            }"#,
        )
        .unwrap();

        assert!(config.test_only);
        assert_eq!(config.revshare_percent, 90.5);
        assert_eq!(config.refresh.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.recall_db_path, Some(PathBuf::from("/tmp/recalls.db")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for json in [
            r#"{"id_attempts": 0}"#,
            r#"{"shard_count": 0}"#,
            r#"{"revshare_percent": -1.0}"#,
            r#"{"refresh_interval_secs": 0}"#,
            r#"{"important_log_capacity": 0}"#,
        ] {
            assert!(
                matches!(EngineConfig::from_json_str(json), Err(BidderError::Config(_))),
                "{} should be rejected",
                json
            );
        }
    }

    #[test]
    fn test_disabled_refresh_allows_zero_interval() {
        let config =
            EngineConfig::from_json_str(r#"{"refresh_enabled": false, "refresh_interval_secs": 0}"#)
                .unwrap();
        assert!(!config.refresh.enabled);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"shard_count": 8}}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.shard_count, 8);

        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/bidder.json"),
            Err(BidderError::Config(_))
        ));
    }
}
