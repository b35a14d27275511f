//! Batch accumulator
//!
//! Owns every batch from its first record until a flush lane removes it.
//! Records land in the *open* batch; the open batch is sealed when it reaches
//! capacity or when the stream ends, at which point its key moves into the
//! ready pool and the open key advances.

use adn_common::Record;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::error::AccumulatorError;
use super::BatchKey;

/// A batch of records, mutable only until sealed
#[derive(Debug, Clone)]
pub enum Batch {
    Open(Vec<Record>),
    Sealed(Arc<[Record]>),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Batch::Open(records) => records.len(),
            Batch::Sealed(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, Batch::Sealed(_))
    }

    /// Records of the batch regardless of state
    pub fn records(&self) -> &[Record] {
        match self {
            Batch::Open(records) => records,
            Batch::Sealed(records) => records,
        }
    }
}

/// Maps batch keys to in-progress or sealed batches
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    batches: BTreeMap<BatchKey, Batch>,
    ready: HashSet<BatchKey>,
    open_key: BatchKey,
    end_of_stream: bool,
    sealed_count: u64,
}

impl BatchAccumulator {
    /// Create an accumulator sealing batches at `batch_size` records.
    ///
    /// A zero size is clamped to 1; callers validate configuration first.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batches: BTreeMap::new(),
            ready: HashSet::new(),
            open_key: BatchKey(0),
            end_of_stream: false,
            sealed_count: 0,
        }
    }

    /// Append a record to the open batch.
    ///
    /// Returns the key of the batch sealed by this call, if any. `is_last`
    /// seals the open batch regardless of its size and ends the stream.
    pub fn push(
        &mut self,
        record: Record,
        is_last: bool,
    ) -> Result<Option<BatchKey>, AccumulatorError> {
        if self.end_of_stream {
            return Err(AccumulatorError::EndOfStream {
                open_key: self.open_key,
            });
        }

        let key = self.open_key;
        let len = match self
            .batches
            .entry(key)
            .or_insert_with(|| Batch::Open(Vec::with_capacity(self.batch_size)))
        {
            Batch::Open(records) => {
                records.push(record);
                records.len()
            }
            Batch::Sealed(_) => return Err(AccumulatorError::SealedOpenKey { key }),
        };

        if is_last {
            self.end_of_stream = true;
        }

        if len >= self.batch_size || is_last {
            return self.seal(key).map(Some);
        }

        Ok(None)
    }

    /// Signal end of stream without a final record.
    ///
    /// Seals the open batch if it holds any records.
    pub fn finish(&mut self) -> Result<Option<BatchKey>, AccumulatorError> {
        if self.end_of_stream {
            return Err(AccumulatorError::EndOfStream {
                open_key: self.open_key,
            });
        }
        self.end_of_stream = true;

        let key = self.open_key;
        match self.batches.get(&key) {
            Some(batch) if !batch.is_empty() => self.seal(key).map(Some),
            _ => Ok(None),
        }
    }

    fn seal(&mut self, key: BatchKey) -> Result<BatchKey, AccumulatorError> {
        let batch = self
            .batches
            .get_mut(&key)
            .ok_or(AccumulatorError::UnknownBatch { key })?;

        if let Batch::Open(records) = batch {
            let records = std::mem::take(records);
            *batch = Batch::Sealed(records.into());
        }

        self.ready.insert(key);
        self.open_key = key.next();
        self.sealed_count += 1;

        Ok(key)
    }

    /// Drain the ready pool. Order is unspecified.
    pub fn take_ready(&mut self) -> Vec<BatchKey> {
        self.ready.drain().collect()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Shared handle on a sealed batch's records
    pub fn sealed(&self, key: BatchKey) -> Option<Arc<[Record]>> {
        match self.batches.get(&key) {
            Some(Batch::Sealed(records)) => Some(Arc::clone(records)),
            _ => None,
        }
    }

    /// Remove a flushed batch
    pub fn remove(&mut self, key: BatchKey) -> Option<Batch> {
        self.ready.remove(&key);
        self.batches.remove(&key)
    }

    pub fn get(&self, key: BatchKey) -> Option<&Batch> {
        self.batches.get(&key)
    }

    /// Number of batches still owned (open or sealed)
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Records held across all remaining batches
    pub fn pending_records(&self) -> usize {
        self.batches.values().map(Batch::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = BatchKey> + '_ {
        self.batches.keys().copied()
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub fn open_key(&self) -> BatchKey {
        self.open_key
    }

    /// Total batches sealed since creation, flushed or not
    pub fn sealed_count(&self) -> u64 {
        self.sealed_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
