//! Flush lanes
//!
//! Each lane owns the receiving end of its pending-key queue, so no other lane
//! can ever see its keys. The lane loop only schedules: the sink write itself
//! runs on the [`FlushPool`](super::FlushPool).

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use super::error::SinkWriteError;
use super::processor::Shared;
use super::report::{LaneExit, LaneReport};
use super::{BatchKey, LaneId};
use crate::sink::SinkError;

/// One scheduling lane of the flush worker pool
pub struct FlushLane {
    id: LaneId,
    pending: UnboundedReceiver<BatchKey>,
    shared: Arc<Shared>,
    report: LaneReport,
}

impl FlushLane {
    pub(crate) fn new(id: LaneId, pending: UnboundedReceiver<BatchKey>, shared: Arc<Shared>) -> Self {
        Self {
            id,
            pending,
            shared,
            report: LaneReport::new(id),
        }
    }

    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Run until drained, timed out, or aborted.
    ///
    /// A sink failure is returned as an error after raising the run-wide
    /// abort flag.
    pub async fn run(mut self) -> Result<LaneReport, SinkWriteError> {
        let poll_interval = self.shared.config.poll_interval;
        debug!(run_id = %self.shared.run_id, lane = self.id.0, "Flush lane started");

        loop {
            if self.shared.timeout.is_cancelled() {
                return Ok(self.abandon(LaneExit::TimedOut));
            }
            if self.shared.abort.is_cancelled() {
                return Ok(self.abandon(LaneExit::Aborted));
            }

            let key = tokio::select! {
                biased;
                _ = self.shared.timeout.cancelled() => continue,
                _ = self.shared.abort.cancelled() => continue,
                next = tokio::time::timeout(poll_interval, self.pending.recv()) => match next {
                    Ok(Some(key)) => key,
                    // Queue closed by end of stream and empty
                    Ok(None) => return Ok(self.finish(LaneExit::Drained)),
                    Err(_) => {
                        trace!(lane = self.id.0, "Lane idle");
                        continue;
                    }
                },
            };

            self.flush(key).await?;
        }
    }

    async fn flush(&mut self, key: BatchKey) -> Result<(), SinkWriteError> {
        let records = self.shared.state.lock().await.accumulator.sealed(key);
        let Some(records) = records else {
            warn!(
                run_id = %self.shared.run_id,
                lane = self.id.0,
                batch_key = key.0,
                "Assigned batch is not a sealed batch held by the accumulator; skipping"
            );
            return Ok(());
        };

        let count = records.len();
        let sink = Arc::clone(&self.shared.sink);
        let collection = self.shared.config.collection.clone();
        let dispatched_at = Instant::now();

        let outcome = match self
            .shared
            .pool
            .dispatch(async move { sink.write(&collection, &records[..]).await })
            .await
        {
            Ok(handle) => match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(SinkError::Dispatch(join_err.to_string())),
            },
            Err(closed) => Err(SinkError::Dispatch(closed.to_string())),
        };

        match outcome {
            Ok(()) => {
                {
                    let mut state = self.shared.state.lock().await;
                    state.accumulator.remove(key);
                    state.flushed_batches += 1;
                    state.flushed_records += count as u64;
                }
                self.report.flushed_batches += 1;
                self.report.flushed_records += count as u64;

                debug!(
                    run_id = %self.shared.run_id,
                    lane = self.id.0,
                    batch_key = key.0,
                    records = count,
                    latency_ms = dispatched_at.elapsed().as_millis() as u64,
                    "Batch flushed"
                );
                Ok(())
            }
            Err(source) => {
                let elapsed = self.shared.elapsed();
                error!(
                    run_id = %self.shared.run_id,
                    lane = self.id.0,
                    batch_key = key.0,
                    records = count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %source,
                    "Bulk write failed, aborting run"
                );
                self.shared.abort.cancel();

                Err(SinkWriteError {
                    key,
                    lane: self.id,
                    collection: self.shared.config.collection.clone(),
                    records: count,
                    elapsed,
                    source,
                })
            }
        }
    }

    /// Stop taking work and count whatever is still queued
    fn abandon(mut self, exit: LaneExit) -> LaneReport {
        self.pending.close();
        let mut abandoned = 0u64;
        while self.pending.try_recv().is_ok() {
            abandoned += 1;
        }
        self.report.abandoned_batches = abandoned;

        if abandoned > 0 {
            warn!(
                run_id = %self.shared.run_id,
                lane = self.id.0,
                abandoned_batches = abandoned,
                elapsed_ms = self.shared.elapsed().as_millis() as u64,
                exit = ?exit,
                "Lane stopped with pending batches"
            );
        }

        self.finish(exit)
    }

    fn finish(mut self, exit: LaneExit) -> LaneReport {
        self.report.exit = exit;
        debug!(
            run_id = %self.shared.run_id,
            lane = self.id.0,
            flushed_batches = self.report.flushed_batches,
            exit = ?exit,
            "Flush lane finished"
        );
        self.report
    }
}
