//! HTTP surface for the OCR service (spec.md §6): routes, request
//! extraction, and error mapping on top of `ocrsvc-dispatch`'s `Dispatcher`.
//!
//! # Endpoints
//!
//! - `POST /ocr/image` - single image OCR (multipart upload or JSON `file_path`)
//! - `POST /ocr/batch` - OCR a list of `file_paths`, ordered per-file results
//! - `POST /ocr/video` - sampled-frame video OCR (multipart upload or JSON `file_path`)
//! - `POST /extract/document` - non-image document text extraction
//! - `GET /health` - recognizer status, never fails
//! - `GET /metrics` - rolling performance counters
//! - `GET /supported_formats` - allowed image/video/document extensions

pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{AppError, Result};
pub use server::{ApiConfig, ApiServer};
pub use state::AppState;
