//! API response types

use adn_ingest::{DrainOutcome, DrainReport, IndexSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of `POST /api/index`
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexFileResponse {
    pub original_filename: String,
    /// Where the upload was spooled while indexing
    pub temp_path: String,
    pub headers: BTreeMap<String, usize>,
    pub status: DrainOutcome,
    pub records_processed: u64,
    pub report: DrainReport,
}

impl IndexFileResponse {
    pub fn new(summary: IndexSummary, temp_path: String) -> Self {
        Self {
            original_filename: summary.original_filename,
            temp_path,
            headers: summary.headers,
            status: summary.status,
            records_processed: summary.records_processed,
            report: summary.report,
        }
    }
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `INVALID_VCF`
    pub code: &'static str,
    pub message: String,
    /// How far the run got before it was aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DrainReport>,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code,
                message: message.into(),
                report: None,
            },
        }
    }

    pub fn with_report(mut self, report: Option<&DrainReport>) -> Self {
        self.error.report = report.cloned();
        self
    }
}
