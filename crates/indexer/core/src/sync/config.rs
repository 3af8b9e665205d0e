use crate::{JitteredDelay, SyncError};
use std::time::Duration;

/// Configuration of a single [`crate::SyncEngine`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// First round to fetch. Must be at least `1`.
    pub start_block: u64,
    /// Last round to fetch, unbounded when `None`.
    pub max_block: Option<u64>,
    /// Capacity of the fetcher to processor channel. Must be at least `1`.
    pub batch_size: usize,
    /// Delay before asking again for a round that was not produced yet.
    pub retry_delay: JitteredDelay,
}

impl SyncConfig {
    /// Default channel capacity.
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    /// Default lower bound of the retry delay.
    pub const DEFAULT_RETRY_DELAY_MIN: Duration = Duration::from_millis(500);
    /// Default upper bound of the retry delay.
    pub const DEFAULT_RETRY_DELAY_MAX: Duration = Duration::from_millis(1000);

    /// Creates a configuration starting at `start_block` with default settings otherwise.
    pub fn new(start_block: u64) -> Self {
        Self { start_block, ..Default::default() }
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.start_block < 1 {
            return Err(SyncError::Configuration("start block must be at least 1".to_string()));
        }
        if self.batch_size < 1 {
            return Err(SyncError::Configuration("batch size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_block: 1,
            max_block: None,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            retry_delay: JitteredDelay::new(
                Self::DEFAULT_RETRY_DELAY_MIN,
                Self::DEFAULT_RETRY_DELAY_MAX,
            )
            .unwrap_or(JitteredDelay::fixed(Self::DEFAULT_RETRY_DELAY_MIN)),
        }
    }
}
