//! ADN Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Indexes VCF variant files into a search engine.
//!
//! # Overview
//!
//! - **Batching engine** ([`batch`]): accumulates records into fixed-size
//!   batches and flushes them concurrently over a bounded set of lanes, with a
//!   global deadline and a graceful drain
//! - **Sinks** ([`sink`]): the [`BulkWriteSink`] seam, a ZincSearch client and
//!   an in-memory sink for dry runs
//! - **Sources** ([`source`], [`vcf`]): plain and gzip VCF readers
//! - **Pipeline** ([`pipeline`]): ties a source, the index mapping and a sink
//!   together for one file
//!
//! # Example
//!
//! ```no_run
//! use adn_ingest::batch::ProcessorConfig;
//! use adn_ingest::pipeline::IndexPipeline;
//! use adn_ingest::sink::ZincSearchClient;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = Arc::new(ZincSearchClient::from_env()?);
//!     let pipeline = IndexPipeline::new(ProcessorConfig::new("vcf_index"), sink)?;
//!     let summary = pipeline.index_file(Path::new("sample.vcf.gz"), "sample.vcf.gz").await?;
//!     println!("{} records indexed", summary.records_processed);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod vcf;

// Re-export commonly used types
pub use batch::{BatchProcessor, DrainOutcome, DrainReport, ProcessorConfig};
pub use config::{IngestConfig, ZincConfig};
pub use error::{IngestError, Result};
pub use pipeline::{IndexPipeline, IndexSummary};
pub use sink::BulkWriteSink;
pub use source::{RecordSource, SourceRecord};
