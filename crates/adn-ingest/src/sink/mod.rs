//! Bulk-write sinks
//!
//! The batching engine only needs [`BulkWriteSink::write`]; the search index
//! implementation also knows how to create its index mapping up front.

pub mod memory;
pub mod zincsearch;

use adn_common::Record;
use async_trait::async_trait;
use thiserror::Error;

use crate::mapping::IndexMapping;

pub use memory::MemorySink;
pub use zincsearch::ZincSearchClient;

/// Failure of a single sink call
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Records list cannot be empty")]
    EmptyBatch,

    #[error("sink rejected the batch: {0}")]
    Rejected(String),

    #[error("flush could not be executed: {0}")]
    Dispatch(String),
}

/// Destination for sealed batches
#[async_trait]
pub trait BulkWriteSink: Send + Sync {
    /// Write one batch, preserving record order
    async fn write(&self, collection: &str, batch: &[Record]) -> Result<(), SinkError>;

    /// Prepare the collection before the first write
    ///
    /// Default implementation does nothing.
    async fn ensure_collection(&self, mapping: &IndexMapping) -> Result<(), SinkError> {
        let _ = mapping;
        Ok(())
    }

    /// Short name used in logs
    fn name(&self) -> &str;
}
