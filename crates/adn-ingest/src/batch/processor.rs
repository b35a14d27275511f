//! Batch processor lifecycle
//!
//! ```text
//! Created --start()--> Running --stop()/last record--> Draining --> Stopped
//!                         |                               |
//!                         +-------- deadline -------------+--> TimedOut
//!                         +-------- sink failure ---------+--> Failed
//! ```
//!
//! The accumulator, the ready pool and the open key live in one aggregate
//! behind a single mutex. Lanes own their pending queues; the processor only
//! holds the sending ends of the current lane generation.

use adn_common::Record;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::accumulator::BatchAccumulator;
use super::assigner::{AssignmentMode, WorkAssigner};
use super::config::ProcessorConfig;
use super::error::{ProcessorError, SinkWriteError};
use super::monitor::TimeoutMonitor;
use super::pool::FlushPool;
use super::report::{DrainOutcome, DrainReport, LaneReport};
use super::worker::FlushLane;
use super::{BatchKey, LaneId};
use crate::sink::BulkWriteSink;

/// Processor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Running,
    Draining,
    Stopped,
    TimedOut,
    Failed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Running => "running",
            Lifecycle::Draining => "draining",
            Lifecycle::Stopped => "stopped",
            Lifecycle::TimedOut => "timed_out",
            Lifecycle::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Stopped | Lifecycle::TimedOut | Lifecycle::Failed)
    }
}

type LaneTask = JoinHandle<Result<LaneReport, SinkWriteError>>;

/// Mutable run state guarded by one lock
pub(crate) struct Inner {
    pub(crate) accumulator: BatchAccumulator,
    pub(crate) flushed_batches: u64,
    pub(crate) flushed_records: u64,
    records_received: u64,
    assigner: WorkAssigner,
    lifecycle: Lifecycle,
    /// Senders of the current lane generation, indexed by lane id
    lanes: Vec<UnboundedSender<BatchKey>>,
    tasks: Vec<(LaneId, LaneTask)>,
    monitor: Option<JoinHandle<bool>>,
}

/// State shared between the processor, its lanes and its monitor
pub(crate) struct Shared {
    pub(crate) run_id: Uuid,
    pub(crate) config: ProcessorConfig,
    pub(crate) sink: Arc<dyn BulkWriteSink>,
    pub(crate) state: Mutex<Inner>,
    pub(crate) pool: FlushPool,
    pub(crate) timeout: CancellationToken,
    pub(crate) abort: CancellationToken,
    end_of_stream: CancellationToken,
    shutdown: CancellationToken,
    started_at: OnceLock<Instant>,
}

impl Shared {
    /// Time since run start, zero before `start()`
    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at
            .get()
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn halted(&self) -> bool {
        self.timeout.is_cancelled() || self.abort.is_cancelled()
    }
}

/// Batching and flush engine driving one ingestion run
pub struct BatchProcessor {
    shared: Arc<Shared>,
}

impl BatchProcessor {
    pub fn new(config: ProcessorConfig, sink: Arc<dyn BulkWriteSink>) -> Result<Self, ProcessorError> {
        config.validate()?;

        let inner = Inner {
            accumulator: BatchAccumulator::new(config.batch_size),
            flushed_batches: 0,
            flushed_records: 0,
            records_received: 0,
            assigner: WorkAssigner::new(config.num_workers),
            lifecycle: Lifecycle::Created,
            lanes: Vec::with_capacity(config.num_workers),
            tasks: Vec::new(),
            monitor: None,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                run_id: Uuid::new_v4(),
                pool: FlushPool::new(config.num_workers),
                config,
                sink,
                state: Mutex::new(inner),
                timeout: CancellationToken::new(),
                abort: CancellationToken::new(),
                end_of_stream: CancellationToken::new(),
                shutdown: CancellationToken::new(),
                started_at: OnceLock::new(),
            }),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.shared.config
    }

    /// Current lifecycle state, accounting for a tripped deadline or abort
    pub async fn lifecycle(&self) -> Lifecycle {
        let state = self.shared.state.lock().await.lifecycle;
        match state {
            Lifecycle::Running | Lifecycle::Draining if self.shared.abort.is_cancelled() => {
                Lifecycle::Failed
            }
            Lifecycle::Running | Lifecycle::Draining if self.shared.timeout.is_cancelled() => {
                Lifecycle::TimedOut
            }
            other => other,
        }
    }

    /// Whether the deadline or a sink failure has stopped flushing
    pub fn is_halted(&self) -> bool {
        self.shared.halted()
    }

    /// Batches still held by the accumulator
    pub async fn remaining_batches(&self) -> usize {
        self.shared.state.lock().await.accumulator.len()
    }

    /// Enqueue one record; `is_last` marks the end of the stream.
    ///
    /// Records must come from a single producer.
    pub async fn add_record(&self, record: Record, is_last: bool) -> Result<(), ProcessorError> {
        let mut inner = self.shared.state.lock().await;
        let sealed = inner.accumulator.push(record, is_last)?;
        inner.records_received += 1;

        if let Some(key) = sealed {
            trace!(run_id = %self.shared.run_id, batch_key = key.0, "Batch sealed");
            let assign_now = inner.lifecycle == Lifecycle::Running
                && self.shared.config.assignment == AssignmentMode::Incremental
                && !self.shared.halted();
            if assign_now {
                self.assign_ready(&mut inner);
            }
        }

        if is_last {
            debug!(
                run_id = %self.shared.run_id,
                records_received = inner.records_received,
                sealed_batches = inner.accumulator.sealed_count(),
                "Last record received"
            );
            self.shared.end_of_stream.cancel();
        }

        Ok(())
    }

    /// Begin processing: spawn the lanes and the deadline monitor
    pub async fn start(&self) -> Result<(), ProcessorError> {
        let mut inner = self.shared.state.lock().await;
        match inner.lifecycle {
            Lifecycle::Created => {
                self.begin(&mut inner);
                Ok(())
            }
            Lifecycle::Running => Ok(()),
            other => Err(ProcessorError::InvalidState {
                action: "start",
                state: other.as_str(),
            }),
        }
    }

    /// Start, wait for the end of the stream (or the deadline), then drain
    pub async fn run(&self) -> Result<DrainReport, ProcessorError> {
        self.start().await?;

        tokio::select! {
            _ = self.shared.end_of_stream.cancelled() => {}
            _ = self.shared.timeout.cancelled() => {}
            _ = self.shared.abort.cancelled() => {}
        }

        self.stop().await
    }

    /// Request graceful shutdown and block until drained.
    ///
    /// Seals the open batch, runs a final assignment pass so every
    /// outstanding batch reaches a lane, waits for all lanes, then releases
    /// the execution pool.
    pub async fn stop(&self) -> Result<DrainReport, ProcessorError> {
        let (tasks, monitor) = {
            let mut inner = self.shared.state.lock().await;
            match inner.lifecycle {
                Lifecycle::Created => self.begin(&mut inner),
                Lifecycle::Running => {}
                other => {
                    return Err(ProcessorError::InvalidState {
                        action: "stop",
                        state: other.as_str(),
                    })
                }
            }

            if !inner.accumulator.is_end_of_stream() {
                if let Some(key) = inner.accumulator.finish()? {
                    trace!(run_id = %self.shared.run_id, batch_key = key.0, "Final batch sealed");
                }
                self.shared.end_of_stream.cancel();
            }

            inner.lifecycle = Lifecycle::Draining;
            info!(
                run_id = %self.shared.run_id,
                remaining_batches = inner.accumulator.len(),
                "Processing remaining batches before shutdown"
            );

            if !self.shared.halted() {
                if self.shared.config.assignment == AssignmentMode::OneShot {
                    // Retire the current generation; a fresh one takes the remainder
                    inner.lanes.clear();
                }
                self.start_pass(&mut inner);
            }

            // Closing the queues lets each lane finish once its keys are done
            inner.lanes.clear();
            (std::mem::take(&mut inner.tasks), inner.monitor.take())
        };

        let progress = self.spawn_progress_reporter();

        let mut lane_reports = Vec::with_capacity(tasks.len());
        let mut failure: Option<SinkWriteError> = None;
        let mut crash: Option<ProcessorError> = None;

        for (lane, task) in tasks {
            match task.await {
                Ok(Ok(report)) => lane_reports.push(report),
                Ok(Err(err)) => {
                    failure.get_or_insert(err);
                }
                Err(join_err) => {
                    crash.get_or_insert(ProcessorError::LaneCrashed {
                        lane,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        progress.abort();
        self.shared.shutdown.cancel();
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }
        self.shared.pool.shutdown().await;

        let report = self.finalize(lane_reports, failure.is_some()).await;

        if let Some(source) = failure {
            return Err(ProcessorError::Aborted {
                report: Box::new(report),
                source,
            });
        }
        if let Some(crash) = crash {
            return Err(crash);
        }

        Ok(report)
    }

    fn begin(&self, inner: &mut Inner) {
        let started_at = *self.shared.started_at.get_or_init(Instant::now);
        inner.lifecycle = Lifecycle::Running;

        inner.monitor = Some(
            TimeoutMonitor::new(
                self.shared.run_id,
                self.shared.config.timeout,
                self.shared.config.monitor_interval,
                started_at,
                self.shared.timeout.clone(),
                self.shared.shutdown.clone(),
            )
            .spawn(),
        );

        self.start_pass(inner);

        info!(
            run_id = %self.shared.run_id,
            collection = %self.shared.config.collection,
            batch_size = self.shared.config.batch_size,
            num_workers = self.shared.config.num_workers,
            timeout_secs = self.shared.config.timeout.as_secs(),
            assignment = %self.shared.config.assignment,
            "Batch processor started"
        );
    }

    /// Spawn a lane generation if none is open, then assign the ready pool
    fn start_pass(&self, inner: &mut Inner) {
        if inner.lanes.is_empty() {
            for i in 0..self.shared.config.num_workers {
                let lane = LaneId(i);
                let (tx, rx) = mpsc::unbounded_channel();
                inner.lanes.push(tx);
                let worker = FlushLane::new(lane, rx, Arc::clone(&self.shared));
                inner.tasks.push((lane, tokio::spawn(worker.run())));
            }
        }

        self.assign_ready(inner);
    }

    fn assign_ready(&self, inner: &mut Inner) {
        let keys = inner.accumulator.take_ready();
        if keys.is_empty() {
            return;
        }

        let per_lane = inner
            .assigner
            .distribute(self.shared.config.assignment, keys);

        for (lane, keys) in per_lane.into_iter().enumerate() {
            for key in keys {
                let sent = inner
                    .lanes
                    .get(lane)
                    .map(|tx| tx.send(key).is_ok())
                    .unwrap_or(false);
                if !sent {
                    warn!(
                        run_id = %self.shared.run_id,
                        lane,
                        batch_key = key.0,
                        "Lane no longer accepts work, batch left unflushed"
                    );
                }
            }
        }
    }

    fn spawn_progress_reporter(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(shared.config.progress_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let remaining = shared.state.lock().await.accumulator.len();
                info!(run_id = %shared.run_id, remaining_batches = remaining, "Remaining batches");
            }
        })
    }

    async fn finalize(&self, lanes: Vec<LaneReport>, failed: bool) -> DrainReport {
        let mut inner = self.shared.state.lock().await;
        let remaining_batches = inner.accumulator.len() as u64;

        let outcome = if failed {
            DrainOutcome::Failed
        } else if remaining_batches > 0 {
            DrainOutcome::TimedOut
        } else {
            DrainOutcome::Completed
        };

        inner.lifecycle = match outcome {
            DrainOutcome::Completed => Lifecycle::Stopped,
            DrainOutcome::TimedOut => Lifecycle::TimedOut,
            DrainOutcome::Failed => Lifecycle::Failed,
        };

        let report = DrainReport {
            outcome,
            records_received: inner.records_received,
            sealed_batches: inner.accumulator.sealed_count(),
            flushed_batches: inner.flushed_batches,
            flushed_records: inner.flushed_records,
            remaining_batches,
            remaining_records: inner.accumulator.pending_records() as u64,
            abandoned_batches: lanes.iter().map(|l| l.abandoned_batches).sum(),
            elapsed: self.shared.elapsed(),
            lanes,
        };

        match report.outcome {
            DrainOutcome::Completed => info!(
                run_id = %self.shared.run_id,
                flushed_batches = report.flushed_batches,
                flushed_records = report.flushed_records,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Batch processor stopped"
            ),
            _ => warn!(
                run_id = %self.shared.run_id,
                outcome = ?report.outcome,
                flushed_batches = report.flushed_batches,
                remaining_batches = report.remaining_batches,
                remaining_records = report.remaining_records,
                abandoned_batches = report.abandoned_batches,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Batch processor stopped with unflushed batches"
            ),
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use adn_common::types::record_from_pairs;

    fn record(i: usize) -> Record {
        record_from_pairs([("POS", i.to_string())])
    }

    fn processor(batch_size: usize, workers: usize, sink: Arc<MemorySink>) -> BatchProcessor {
        let config = ProcessorConfig::new("vcf_index")
            .with_batch_size(batch_size)
            .with_num_workers(workers)
            .with_poll_interval(Duration::from_millis(5))
            .with_monitor_interval(Duration::from_millis(5));
        BatchProcessor::new(config, sink).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ProcessorConfig::new("vcf_index").with_batch_size(0);
        let result = BatchProcessor::new(config, Arc::new(MemorySink::new()));
        assert!(matches!(result, Err(ProcessorError::Config(_))));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let sink = Arc::new(MemorySink::new());
        let processor = processor(2, 2, sink);
        assert_eq!(processor.lifecycle().await, Lifecycle::Created);

        processor.start().await.unwrap();
        assert_eq!(processor.lifecycle().await, Lifecycle::Running);

        processor.add_record(record(0), false).await.unwrap();
        let report = processor.stop().await.unwrap();
        assert!(report.is_complete());
        assert_eq!(processor.lifecycle().await, Lifecycle::Stopped);

        assert!(matches!(
            processor.stop().await,
            Err(ProcessorError::InvalidState { action: "stop", .. })
        ));
        assert!(processor.start().await.is_err());
    }

    #[tokio::test]
    async fn test_record_after_last_is_rejected() {
        let sink = Arc::new(MemorySink::new());
        let processor = processor(4, 1, sink);
        processor.add_record(record(0), true).await.unwrap();

        let err = processor.add_record(record(1), false).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Accumulator(_)));
    }

    #[tokio::test]
    async fn test_stop_without_start_flushes_everything() {
        let sink = Arc::new(MemorySink::new());
        let processor = processor(3, 2, sink.clone());
        for i in 0..5 {
            processor.add_record(record(i), false).await.unwrap();
        }

        let report = processor.stop().await.unwrap();
        assert_eq!(report.sealed_batches, 2);
        assert_eq!(report.flushed_records, 5);
        assert_eq!(sink.record_count(), 5);
        assert_eq!(processor.remaining_batches().await, 0);
    }

    #[tokio::test]
    async fn test_empty_run_completes() {
        let sink = Arc::new(MemorySink::new());
        let processor = processor(3, 4, sink.clone());
        processor.start().await.unwrap();

        let report = processor.stop().await.unwrap();
        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.sealed_batches, 0);
        assert_eq!(report.lanes.len(), 4);
        assert_eq!(sink.write_count(), 0);
    }
}
