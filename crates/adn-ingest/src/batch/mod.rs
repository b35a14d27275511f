//! Concurrent batching and flush engine
//!
//! A single producer feeds records into a [`BatchAccumulator`]; sealed batches
//! are spread across a fixed number of flush lanes by the [`WorkAssigner`];
//! each lane hands the actual sink write to a bounded [`FlushPool`] so its own
//! scheduling loop never blocks on the network. A [`TimeoutMonitor`] trips a
//! global deadline, and the [`BatchProcessor`] drives the whole lifecycle.

pub mod accumulator;
pub mod assigner;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pool;
pub mod processor;
pub mod report;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use accumulator::{Batch, BatchAccumulator};
pub use assigner::{AssignmentMode, WorkAssigner};
pub use config::ProcessorConfig;
pub use error::{AccumulatorError, ProcessorError, SinkWriteError};
pub use monitor::TimeoutMonitor;
pub use pool::FlushPool;
pub use processor::{BatchProcessor, Lifecycle};
pub use report::{DrainOutcome, DrainReport, LaneExit, LaneReport};
pub use worker::FlushLane;

/// Monotonically increasing batch identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchKey(pub u64);

impl BatchKey {
    pub fn next(self) -> Self {
        BatchKey(self.0 + 1)
    }
}

impl std::fmt::Display for BatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a flush lane, `0..num_workers`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LaneId(pub usize);

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
