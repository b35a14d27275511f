//! Run and lane outcome reports

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LaneId;

/// Why a lane stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneExit {
    /// End of stream seen with nothing left pending
    Drained,
    /// Deadline tripped; pending keys abandoned
    TimedOut,
    /// Another lane's sink failure aborted the run
    Aborted,
}

/// Per-lane counters returned when a lane finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneReport {
    pub lane: LaneId,
    pub exit: LaneExit,
    pub flushed_batches: u64,
    pub flushed_records: u64,
    /// Keys still pending on this lane when it stopped
    pub abandoned_batches: u64,
}

impl LaneReport {
    pub(crate) fn new(lane: LaneId) -> Self {
        Self {
            lane,
            exit: LaneExit::Drained,
            flushed_batches: 0,
            flushed_records: 0,
            abandoned_batches: 0,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Every sealed batch reached the sink
    Completed,
    /// The deadline truncated the run
    TimedOut,
    /// A sink write failed
    Failed,
}

/// Final accounting of a run, returned by `stop()` and `run()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    pub records_received: u64,
    pub sealed_batches: u64,
    pub flushed_batches: u64,
    pub flushed_records: u64,
    /// Batches still held by the accumulator: dropped by timeout or failure
    pub remaining_batches: u64,
    pub remaining_records: u64,
    /// Subset of remaining batches that had been assigned to a lane
    pub abandoned_batches: u64,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub lanes: Vec<LaneReport>,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == DrainOutcome::Completed && self.remaining_batches == 0
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
