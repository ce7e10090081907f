//! Store configuration.
//!
//! Values are supplied by the embedding application; the core reads no
//! environment variables or files.

use crate::service::metrics::ScorePolicy;

/// Storage key holding the whole document.
pub const DEFAULT_STORAGE_KEY: &str = "civicData";
/// Snapshot file names are `<prefix>-<epoch ms>.json`.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "civic-backup";
/// Per-value quota, matching the common browser storage limit.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key the serialized document is stored under.
    pub storage_key: String,
    /// Thresholds used to band the resilience score.
    pub score_policy: ScorePolicy,
    pub snapshot_prefix: String,
    /// `None` disables the quota.
    pub max_value_bytes: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            score_policy: ScorePolicy::CURRENT,
            snapshot_prefix: DEFAULT_SNAPSHOT_PREFIX.to_string(),
            max_value_bytes: Some(DEFAULT_MAX_VALUE_BYTES),
        }
    }
}

impl StoreConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_score_policy(mut self, policy: ScorePolicy) -> Self {
        self.score_policy = policy;
        self
    }

    pub fn with_max_value_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_value_bytes = limit;
        self
    }

    /// Snapshot file name for an export taken at `epoch_ms`.
    pub fn snapshot_file_name(&self, epoch_ms: i64) -> String {
        format!("{}-{epoch_ms}.json", self.snapshot_prefix)
    }
}
