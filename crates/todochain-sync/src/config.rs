use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Retry behaviour of ledger syncs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Failures after which a todo is left `failed` for an operator (default: 10).
    pub max_retries: u32,
    /// Delay before retry `n`, indexed by `retry_count - 1`. The last entry
    /// caps every later retry.
    pub backoff_secs: Vec<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_secs: vec![0, 60, 300, 900, 3_600, 21_600],
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_retries == 0 {
            return Err(SyncError::Config("sync.max_retries must be at least 1".into()));
        }
        if self.backoff_secs.is_empty() {
            return Err(SyncError::Config("sync.backoff_secs must not be empty".into()));
        }
        Ok(())
    }
}

/// Schedule of the background retry sweeper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    /// Seconds between runs (default: 30).
    pub interval_secs: u64,
    /// Maximum todos picked up per query per run (default: 50).
    pub batch_size: usize,
    /// A `pending` todo untouched for this long is treated as abandoned,
    /// e.g. by a crash before its first attempt (default: 300).
    pub stale_pending_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            batch_size: 50,
            stale_pending_secs: 300,
        }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn stale_pending_after(&self) -> Duration {
        Duration::from_secs(self.stale_pending_secs)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.interval_secs == 0 {
            return Err(SyncError::Config("sweeper.interval_secs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("sweeper.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}
