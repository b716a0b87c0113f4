//! POST /ocr/image handler (spec.md §6)

use crate::error::Result;
use crate::extract::ImageUpload;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use ocrsvc_core::OCRResult;
use std::sync::Arc;
use tracing::debug;

pub async fn ocr_image(State(state): State<Arc<AppState>>, upload: ImageUpload) -> Result<Json<OCRResult>> {
    debug!(path = %upload.file.path.display(), "image OCR request");
    let result = state
        .dispatcher
        .submit_image(&upload.file.path, &upload.preprocess, &upload.text_opts)
        .await?;
    Ok(Json(result))
}
