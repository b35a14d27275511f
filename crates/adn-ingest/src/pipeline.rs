//! File indexing pipeline
//!
//! Opens a VCF file, applies the index mapping derived from its header, then
//! streams every data line through a [`BatchProcessor`]. The source is read on
//! a blocking thread and handed over through a bounded channel, which caps the
//! records parsed ahead of `add_record`. Sealed batches are held by the
//! accumulator until a lane flushes them, so a sink slower than the reader
//! lets them accumulate in memory.

use adn_common::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::batch::{BatchProcessor, DrainOutcome, DrainReport, ProcessorConfig};
use crate::error::{IngestError, Result};
use crate::mapping::{create_index_mapping_from_headers, FILENAME_FIELD};
use crate::sink::BulkWriteSink;
use crate::source::{RecordSource, SourceRecord};
use crate::vcf::VcfReader;

/// Records between two progress log lines
pub const PROGRESS_EVERY_RECORDS: u64 = 100_000;

/// Records buffered between the reader thread and the processor
const FEED_CHANNEL_CAPACITY: usize = 4096;

/// Result of indexing one file
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub original_filename: String,
    /// Column name to position, from the `#CHROM` header
    pub headers: BTreeMap<String, usize>,
    pub status: DrainOutcome,
    pub records_processed: u64,
    pub report: DrainReport,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Indexes record sources into one collection of a sink
#[derive(Clone)]
pub struct IndexPipeline {
    config: ProcessorConfig,
    sink: Arc<dyn BulkWriteSink>,
}

impl IndexPipeline {
    pub fn new(config: ProcessorConfig, sink: Arc<dyn BulkWriteSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, sink })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Index a VCF file (plain or gzip) stored at `path`
    ///
    /// `original_filename` is stamped on every document and reported back;
    /// uploads are stored under a temporary name, so it may differ from `path`.
    pub async fn index_file(&self, path: &Path, original_filename: &str) -> Result<IndexSummary> {
        let path: PathBuf = path.to_path_buf();
        let reader = tokio::task::spawn_blocking(move || VcfReader::open(path)).await??;
        let headers = reader.index().by_name.clone();

        let mapping = create_index_mapping_from_headers(&self.config.collection, &reader.headers());
        self.sink.ensure_collection(&mapping).await?;
        info!(
            index = %self.config.collection,
            sink = self.sink.name(),
            columns = headers.len(),
            "Index mapping ready"
        );

        let mut summary = self.index_source(reader, original_filename).await?;
        summary.headers = headers;
        Ok(summary)
    }

    /// Stream every record of `source` through a fresh batch processor
    pub async fn index_source<S>(&self, source: S, original_filename: &str) -> Result<IndexSummary>
    where
        S: RecordSource + Send + 'static,
        S::Error: Into<IngestError>,
    {
        let started_at = Utc::now();
        let clock = Instant::now();

        let processor = BatchProcessor::new(self.config.clone(), Arc::clone(&self.sink))?;
        processor.start().await?;

        info!(
            run_id = %processor.run_id(),
            file = %original_filename,
            batch_size = self.config.batch_size,
            workers = self.config.num_workers,
            assignment = %self.config.assignment,
            "Indexing started"
        );

        let fed = self.feed(&processor, source, original_filename).await;

        // Drain whatever was accepted, even when reading failed part way
        let drained = processor.stop().await;
        let records_processed = fed?;
        let report = drained?;

        if report.outcome == DrainOutcome::TimedOut {
            warn!(
                run_id = %processor.run_id(),
                records_processed,
                remaining_batches = report.remaining_batches,
                "Indexing truncated by deadline"
            );
        }

        info!(
            run_id = %processor.run_id(),
            records_processed,
            flushed_batches = report.flushed_batches,
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "Indexing finished"
        );

        Ok(IndexSummary {
            original_filename: original_filename.to_string(),
            headers: BTreeMap::new(),
            status: report.outcome,
            records_processed,
            report,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        })
    }

    async fn feed<S>(
        &self,
        processor: &BatchProcessor,
        source: S,
        original_filename: &str,
    ) -> Result<u64>
    where
        S: RecordSource + Send + 'static,
        S::Error: Into<IngestError>,
    {
        let (tx, mut rx) = mpsc::channel::<std::result::Result<SourceRecord, S::Error>>(
            FEED_CHANNEL_CAPACITY,
        );

        let reader = tokio::task::spawn_blocking(move || {
            let mut source = source;
            loop {
                let item = match source.next_record() {
                    Ok(Some(record)) => Ok(record),
                    Ok(None) => break,
                    Err(err) => Err(err),
                };
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() || failed {
                    break;
                }
            }
        });

        let filename = Value::String(original_filename.to_string());
        let mut count = 0u64;
        let mut outcome: Result<()> = Ok(());

        while let Some(item) = rx.recv().await {
            let SourceRecord { mut record, is_last } = match item {
                Ok(record) => record,
                Err(err) => {
                    outcome = Err(err.into());
                    break;
                }
            };

            stamp(&mut record, &filename);
            if let Err(err) = processor.add_record(record, is_last).await {
                outcome = Err(err.into());
                break;
            }
            count += 1;

            if count % PROGRESS_EVERY_RECORDS == 0 {
                info!(run_id = %processor.run_id(), records = count, "Processed records");
            }

            if processor.is_halted() {
                warn!(
                    run_id = %processor.run_id(),
                    records = count,
                    "Processor halted, no longer reading the source"
                );
                break;
            }
        }

        // Unblocks the reader if it is waiting on a full channel
        drop(rx);
        reader.await?;

        outcome.map(|()| count)
    }
}

fn stamp(record: &mut Record, filename: &Value) {
    record.insert(FILENAME_FIELD.to_string(), filename.clone());
}
