//! ADN Ingest - VCF indexing tool

use adn_common::logging::{init_logging, LogConfig, LogLevel};
use adn_ingest::batch::{AssignmentMode, DrainOutcome};
use adn_ingest::mapping::create_index_mapping_from_headers;
use adn_ingest::sink::{BulkWriteSink, MemorySink, ZincSearchClient};
use adn_ingest::vcf::VcfReader;
use adn_ingest::{IndexPipeline, IngestConfig};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "adn-ingest")]
#[command(author, version, about = "Index VCF files into ZincSearch")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a VCF file (plain or gzip)
    Index {
        /// Path to the VCF file
        file: PathBuf,

        /// Records per bulk request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Concurrent flush lanes
        #[arg(short, long)]
        workers: Option<usize>,

        /// Run deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Target index
        #[arg(short, long)]
        index_name: Option<String>,

        /// How sealed batches are handed to lanes (incremental, one_shot)
        #[arg(long)]
        assignment: Option<AssignmentMode>,

        /// ZincSearch base URL
        #[arg(long, env = "ZINC_BASE_URL")]
        zinc_url: Option<String>,

        /// Batch in memory without contacting ZincSearch
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the index mapping derived from a VCF header
    Mapping {
        /// Path to the VCF file
        file: PathBuf,

        /// Index name to put in the mapping
        #[arg(short, long)]
        index_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::for_binary("adn-ingest")
        .with_level(log_level)
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Index {
            file,
            batch_size,
            workers,
            timeout_secs,
            index_name,
            assignment,
            zinc_url,
            dry_run,
        } => {
            let mut config = IngestConfig::from_env()?;
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(workers) = workers {
                config.num_workers = workers;
            }
            if let Some(timeout_secs) = timeout_secs {
                config.timeout_secs = timeout_secs;
            }
            if let Some(index_name) = index_name {
                config.index_name = index_name;
            }
            if let Some(assignment) = assignment {
                config.assignment = assignment;
            }
            if let Some(zinc_url) = zinc_url {
                config.zinc.base_url = zinc_url;
            }
            config.validate()?;

            index(&file, &config, dry_run).await?;
        }
        Command::Mapping { file, index_name } => {
            let index_name = index_name.unwrap_or_else(|| IngestConfig::default().index_name);
            let reader = VcfReader::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let mapping = create_index_mapping_from_headers(&index_name, &reader.headers());
            println!("{}", serde_json::to_string_pretty(&mapping)?);
        }
    }

    Ok(())
}

async fn index(file: &Path, config: &IngestConfig, dry_run: bool) -> Result<()> {
    let memory = Arc::new(MemorySink::new());
    let sink: Arc<dyn BulkWriteSink> = if dry_run {
        memory.clone()
    } else {
        Arc::new(ZincSearchClient::new(config.zinc.clone())?)
    };

    info!(
        file = %file.display(),
        index = %config.index_name,
        sink = sink.name(),
        "Indexing file"
    );

    let original_filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let pipeline = IndexPipeline::new(config.processor_config(), sink)?;
    let summary = match pipeline.index_file(file, &original_filename).await {
        Ok(summary) => summary,
        Err(err) => {
            if let Some(report) = err.report() {
                error!(
                    flushed_batches = report.flushed_batches,
                    remaining_batches = report.remaining_batches,
                    "Indexing aborted"
                );
            }
            return Err(err.into());
        }
    };

    if dry_run {
        info!(
            bulk_requests = memory.write_count(),
            documents = memory.record_count(),
            "Dry run finished"
        );
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.status == DrainOutcome::TimedOut {
        bail!(
            "deadline reached with {} batches ({} records) not indexed",
            summary.report.remaining_batches,
            summary.report.remaining_records
        );
    }

    Ok(())
}
