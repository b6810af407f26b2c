use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use todochain_types::Todo;

use crate::config::SyncConfig;

/// When a failed todo may be retried, and when it never will be again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(schedule: Vec<Duration>, max_retries: u32) -> Self {
        Self {
            schedule,
            max_retries,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config
                .backoff_secs
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            config.max_retries,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay owed after `retry_count` failures. The first retry is
    /// immediate; past the schedule the last entry applies.
    pub fn delay(&self, retry_count: u32) -> Duration {
        let index = retry_count.saturating_sub(1) as usize;
        self.schedule
            .get(index)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or_default()
    }

    /// Whether the backoff for `todo` has elapsed at `now`.
    pub fn is_due(&self, todo: &Todo, now: DateTime<Utc>) -> bool {
        let Some(last_attempt) = todo.sync.last_attempt_at else {
            return true;
        };
        let delay = TimeDelta::from_std(self.delay(todo.sync.retry_count))
            .unwrap_or(TimeDelta::MAX);
        last_attempt
            .checked_add_signed(delay)
            .map_or(false, |due| due <= now)
    }

    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
