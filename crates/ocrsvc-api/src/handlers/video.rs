//! POST /ocr/video handler (spec.md §6)

use crate::error::Result;
use crate::extract::VideoUpload;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use ocrsvc_core::VideoOCRResult;
use std::sync::Arc;
use tracing::debug;

pub async fn ocr_video(State(state): State<Arc<AppState>>, upload: VideoUpload) -> Result<Json<VideoOCRResult>> {
    debug!(path = %upload.file.path.display(), "video OCR request");
    let result = state
        .dispatcher
        .submit_video(&upload.file.path, &upload.video_opts, &upload.preprocess)
        .await?;
    Ok(Json(result))
}
