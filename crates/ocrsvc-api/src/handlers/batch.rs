//! POST /ocr/batch handler (spec.md §6). JSON-only -- spec.md's table lists
//! `/ocr/batch` as a plain `{file_paths[], ...}` body, no multipart form.

use crate::error::{AppError, Result};
use crate::models::BatchOcrRequest;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use ocrsvc_core::BatchOCRResult;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub async fn ocr_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchOcrRequest>,
) -> Result<Json<BatchOCRResult>> {
    if req.file_paths.is_empty() {
        return Err(AppError::InvalidRequest(
            "file_paths must not be empty".to_string(),
        ));
    }
    let max_batch_size = state.dispatcher.config().max_batch_size;
    if req.file_paths.len() > max_batch_size {
        return Err(AppError::InvalidRequest(format!(
            "batch of {} files exceeds the maximum of {max_batch_size}",
            req.file_paths.len()
        )));
    }

    debug!(count = req.file_paths.len(), "batch OCR request");
    let paths: Vec<PathBuf> = req.file_paths.into_iter().map(PathBuf::from).collect();
    let preprocess = req.preprocessing_options.unwrap_or_default();
    let text_opts = req.text_processing_options.unwrap_or_default();

    let result = state.dispatcher.submit_batch(&paths, &preprocess, &text_opts).await;
    Ok(Json(result))
}
