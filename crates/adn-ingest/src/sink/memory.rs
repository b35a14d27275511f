//! In-memory sink
//!
//! Keeps every written batch. Supports a fixed per-write latency and a
//! one-off failure on the n-th call, which makes it the sink of choice for
//! dry runs and for exercising drain and abort paths.

use adn_common::Record;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{BulkWriteSink, SinkError};
use crate::mapping::IndexMapping;

#[derive(Debug, Clone)]
pub struct WrittenBatch {
    pub collection: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<WrittenBatch>>,
    mappings: Mutex<Vec<IndexMapping>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
    fail_on_call: Option<usize>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every write
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the n-th write call (1-based)
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn batches(&self) -> Vec<WrittenBatch> {
        locked(&self.batches).clone()
    }

    /// All written records, batch by batch
    pub fn records(&self) -> Vec<Record> {
        locked(&self.batches)
            .iter()
            .flat_map(|b| b.records.iter().cloned())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        locked(&self.batches).iter().map(|b| b.records.len()).sum()
    }

    /// Successful writes
    pub fn write_count(&self) -> usize {
        locked(&self.batches).len()
    }

    /// Write attempts, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn mappings(&self) -> Vec<IndexMapping> {
        locked(&self.mappings).clone()
    }
}

#[async_trait]
impl BulkWriteSink for MemorySink {
    async fn write(&self, collection: &str, batch: &[Record]) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_on_call == Some(call) {
            return Err(SinkError::Rejected(format!("injected failure on call {call}")));
        }

        if batch.is_empty() {
            return Err(SinkError::EmptyBatch);
        }

        locked(&self.batches).push(WrittenBatch {
            collection: collection.to_string(),
            records: batch.to_vec(),
        });

        Ok(())
    }

    async fn ensure_collection(&self, mapping: &IndexMapping) -> Result<(), SinkError> {
        locked(&self.mappings).push(mapping.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
