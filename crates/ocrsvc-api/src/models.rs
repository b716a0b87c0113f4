//! Wire-level request/response shapes (spec.md §6). These mirror
//! `ocrsvc-core`'s domain types closely but stay separate from them: a
//! request body is allowed to omit fields (falling back to `Default`), while
//! the domain types the dispatcher consumes are always fully populated.

use ocrsvc_core::{PreprocessOpts, TextOpts, VideoOpts};
use serde::{Deserialize, Serialize};

/// JSON body for `POST /ocr/image` (spec.md §6). Multipart uploads use
/// [`crate::extract::ImageUpload`] instead; this shape is also what that
/// extractor parses `preprocessing_options`/`text_processing_options` text
/// fields as.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageOcrRequest {
    pub file_path: Option<String>,
    #[serde(default)]
    pub preprocessing_options: Option<PreprocessOpts>,
    #[serde(default)]
    pub text_processing_options: Option<TextOpts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchOcrRequest {
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub preprocessing_options: Option<PreprocessOpts>,
    #[serde(default)]
    pub text_processing_options: Option<TextOpts>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoOcrRequest {
    pub file_path: Option<String>,
    #[serde(default)]
    pub video_options: Option<VideoOpts>,
    #[serde(default)]
    pub preprocessing_options: Option<PreprocessOpts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentExtractionRequest {
    pub file_path: String,
}

/// `GET /health` response (spec.md §6: `{status, ocr_status}`).
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ocr_status: ocrsvc_ocr::RecognizerStatus,
}

/// `GET /supported_formats` response (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct SupportedFormatsResponse {
    pub images: &'static [&'static str],
    pub videos: &'static [&'static str],
    pub documents: &'static [&'static str],
}
