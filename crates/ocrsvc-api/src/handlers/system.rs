//! GET /health, /metrics, /supported_formats (spec.md §6)

use crate::models::{HealthResponse, SupportedFormatsResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use ocrsvc_core::{SUPPORTED_DOCUMENT_FORMATS, SUPPORTED_IMAGE_FORMATS, SUPPORTED_VIDEO_FORMATS};
use ocrsvc_dispatch::MetricsSnapshot;
use std::sync::Arc;

/// GET /health -- reports `ocr_status` from the Recognizer adapter without
/// ever failing the request, per spec.md §4.4 ("health endpoints report
/// `ocr_status = not_initialized`" rather than a 5xx).
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ocr_status = state.dispatcher.recognizer_status().await;
    Json(HealthResponse {
        status: "ok",
        ocr_status,
    })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.dispatcher.metrics_snapshot().await)
}

pub async fn supported_formats() -> Json<SupportedFormatsResponse> {
    Json(SupportedFormatsResponse {
        images: SUPPORTED_IMAGE_FORMATS,
        videos: SUPPORTED_VIDEO_FORMATS,
        documents: SUPPORTED_DOCUMENT_FORMATS,
    })
}
