//! POST /extract/document handler (spec.md §6). JSON-only, delegated
//! entirely to the registered document adapter.

use crate::error::Result;
use crate::models::DocumentExtractionRequest;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use ocrsvc_core::DocumentExtractionResult;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn extract_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentExtractionRequest>,
) -> Result<Json<DocumentExtractionResult>> {
    let result = state
        .dispatcher
        .extract_document(&PathBuf::from(req.file_path))
        .await?;
    Ok(Json(result))
}
