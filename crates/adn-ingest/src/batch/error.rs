//! Error types for the batching engine

use std::time::Duration;
use thiserror::Error;

use super::report::DrainReport;
use super::{BatchKey, LaneId};
use crate::sink::SinkError;

/// Precondition violations on the accumulator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorError {
    #[error("record added after end of stream (open batch key {open_key})")]
    EndOfStream { open_key: BatchKey },

    #[error("open batch key {key} is already sealed")]
    SealedOpenKey { key: BatchKey },

    #[error("batch {key} is not held by the accumulator")]
    UnknownBatch { key: BatchKey },
}

/// A flush call to the sink failed; fatal for the run
#[derive(Error, Debug)]
#[error("bulk write of batch {key} ({records} records) to '{collection}' failed on lane {lane} after {elapsed:?}: {source}")]
pub struct SinkWriteError {
    pub key: BatchKey,
    pub lane: LaneId,
    pub collection: String,
    pub records: usize,
    /// Time since run start when the failure was observed
    pub elapsed: Duration,
    #[source]
    pub source: SinkError,
}

/// Errors surfaced by [`super::BatchProcessor`]
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),

    #[error("invalid lifecycle transition: cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("run aborted ({} batches flushed, {} lost): {source}", .report.flushed_batches, .report.remaining_batches)]
    Aborted {
        report: Box<DrainReport>,
        #[source]
        source: SinkWriteError,
    },

    #[error("flush lane {lane} terminated abnormally: {message}")]
    LaneCrashed { lane: LaneId, message: String },
}

impl ProcessorError {
    /// Drain report attached to an aborted run
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            ProcessorError::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }
}
