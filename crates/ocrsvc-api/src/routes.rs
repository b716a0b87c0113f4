//! Route table (spec.md §6). Flat, since this service has no browser-facing
//! frontend to nest API routes under or fall back to.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ocr/image", post(handlers::image::ocr_image))
        .route("/ocr/batch", post(handlers::batch::ocr_batch))
        .route("/ocr/video", post(handlers::video::ocr_video))
        .route("/extract/document", post(handlers::document::extract_document))
        .route("/health", get(handlers::system::health))
        .route("/metrics", get(handlers::system::metrics))
        .route("/supported_formats", get(handlers::system::supported_formats))
        .with_state(state)
}
