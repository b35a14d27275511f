//! Error types for indexing runs

use adn_common::AdnError;
use thiserror::Error;

use crate::batch::ProcessorError;
use crate::sink::SinkError;
use crate::vcf::VcfError;

/// Top-level error for the ingest crate
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Vcf(#[from] VcfError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<std::convert::Infallible> for IngestError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl From<AdnError> for IngestError {
    fn from(err: AdnError) -> Self {
        match err {
            AdnError::Config(message) => IngestError::Config(message),
            AdnError::Io(io) => IngestError::Io(io),
        }
    }
}

impl IngestError {
    /// Report of the drain that ended this run, if the run got that far
    pub fn report(&self) -> Option<&crate::batch::DrainReport> {
        match self {
            IngestError::Processor(err) => err.report(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
