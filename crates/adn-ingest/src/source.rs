//! Record sources feeding the batch processor

use adn_common::Record;
use std::collections::VecDeque;
use std::convert::Infallible;

/// One record plus whether it is the final one of the stream
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub record: Record,
    pub is_last: bool,
}

/// A finite, ordered stream of records
///
/// The final record carries `is_last = true`. A source with no records at all
/// simply returns `None` on the first call.
pub trait RecordSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn next_record(&mut self) -> Result<Option<SourceRecord>, Self::Error>;
}

/// Source over records already in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: VecDeque<Record>,
}

impl MemorySource {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for MemorySource {
    type Error = Infallible;

    fn next_record(&mut self) -> Result<Option<SourceRecord>, Infallible> {
        Ok(self.records.pop_front().map(|record| SourceRecord {
            record,
            is_last: self.records.is_empty(),
        }))
    }
}
