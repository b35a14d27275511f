//! Server-specific error types

use adn_ingest::batch::ProcessorError;
use adn_ingest::IngestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Indexing failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Ingest(IngestError::Vcf(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VCF")
            }
            AppError::Ingest(IngestError::Sink(_))
            | AppError::Ingest(IngestError::Processor(ProcessorError::Aborted { .. })) => {
                (StatusCode::BAD_GATEWAY, "SINK_ERROR")
            }
            AppError::Ingest(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INDEXING_ERROR"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::warn!(code, error = %self, "Request rejected");
        }

        let body = match &self {
            AppError::Ingest(err) => {
                ErrorResponse::new(code, self.to_string()).with_report(err.report())
            }
            AppError::Io(_) => ErrorResponse::new(code, "An IO error occurred"),
            _ => ErrorResponse::new(code, self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use adn_ingest::vcf::VcfError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("no file".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Ingest(IngestError::Vcf(VcfError::MissingHeader))
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Ingest(IngestError::Config("bad".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Io(std::io::Error::other("disk full"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
