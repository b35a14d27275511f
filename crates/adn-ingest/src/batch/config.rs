//! Batch processor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::assigner::AssignmentMode;
use super::error::ProcessorError;

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of flush lanes (and execution pool permits).
pub const DEFAULT_NUM_WORKERS: usize = 20;

/// Default run deadline in seconds (2 hours).
pub const DEFAULT_TIMEOUT_SECS: u64 = 60 * 120;

/// Default lane idle tick in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default deadline check interval in milliseconds.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 100;

/// Default interval between drain progress logs in seconds.
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 5;

/// Configuration fixed at processor construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Records per batch, at least 1
    pub batch_size: usize,
    /// Wall-clock deadline measured from run start
    pub timeout: Duration,
    /// Target collection (search index) name
    pub collection: String,
    /// Number of flush lanes, at least 1
    pub num_workers: usize,
    /// How sealed batches reach lanes
    pub assignment: AssignmentMode,
    /// Idle lane wake-up tick
    pub poll_interval: Duration,
    /// Deadline check tick
    pub monitor_interval: Duration,
    /// Interval between remaining-batch logs while draining
    pub progress_interval: Duration,
}

impl ProcessorConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_assignment(mut self, assignment: AssignmentMode) -> Self {
        self.assignment = assignment;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_monitor_interval(mut self, monitor_interval: Duration) -> Self {
        self.monitor_interval = monitor_interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ProcessorError> {
        if self.batch_size == 0 {
            return Err(ProcessorError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }

        if self.num_workers == 0 {
            return Err(ProcessorError::Config(
                "num_workers must be at least 1".to_string(),
            ));
        }

        if self.collection.trim().is_empty() {
            return Err(ProcessorError::Config(
                "collection name cannot be empty".to_string(),
            ));
        }

        if self.poll_interval.is_zero() || self.monitor_interval.is_zero() {
            return Err(ProcessorError::Config(
                "poll and monitor intervals must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            collection: "vcf_index".to_string(),
            num_workers: DEFAULT_NUM_WORKERS,
            assignment: AssignmentMode::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            monitor_interval: Duration::from_millis(DEFAULT_MONITOR_INTERVAL_MS),
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
        }
    }
}
