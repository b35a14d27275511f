//! VCF upload and indexing endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use super::response::IndexFileResponse;
use super::AppState;
use crate::error::{AppError, AppResult};

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Spool the uploaded file to the upload directory, then index it.
///
/// The spooled copy keeps the original extension and is deleted once the
/// response is built.
#[tracing::instrument(skip(state, multipart))]
pub async fn index_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<IndexFileResponse>> {
    let started = Instant::now();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".to_string()))?;

        tokio::fs::create_dir_all(&state.upload_dir).await?;
        let suffix = Path::new(&original_filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let spool = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&state.upload_dir)?;

        let mut file = tokio::fs::File::from_std(spool.reopen()?);
        let mut bytes = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {e}")))?
        {
            bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let temp_path = spool.path().display().to_string();
        tracing::info!(
            file = %original_filename,
            temp_path = %temp_path,
            bytes,
            "Upload stored, indexing"
        );

        let summary = state
            .pipeline
            .index_file(spool.path(), &original_filename)
            .await?;

        tracing::info!(
            file = %original_filename,
            records = summary.records_processed,
            status = ?summary.status,
            total_ms = started.elapsed().as_millis() as u64,
            "Upload indexed"
        );

        return Ok(Json(IndexFileResponse::new(summary, temp_path)));
    }

    Err(AppError::BadRequest(
        "No file field found in multipart data".to_string(),
    ))
}
