//! Content-type-based negotiation between multipart uploads and JSON bodies
//! for the two endpoints spec.md §6 marks as accepting either
//! (`/ocr/image`, `/ocr/video`: "multipart(file|file_path) ... or JSON").

use axum::async_trait;
use axum::extract::multipart::{Field, Multipart};
use axum::extract::{FromRequest, Json, Request};
use ocrsvc_core::{PreprocessOpts, TextOpts, VideoOpts};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::AppError;
use crate::models::{ImageOcrRequest, VideoOcrRequest};
use crate::state::AppState;

/// A file to run OCR against: either a path already on disk (JSON
/// `file_path`, or a multipart `file_path` text field) or a freshly-written
/// temp file (multipart `file` binary field). Holding the `NamedTempFile`
/// guard alongside the path keeps the upload alive -- and deletes it -- for
/// exactly the handler's lifetime.
pub struct ResolvedFile {
    pub path: PathBuf,
    _guard: Option<NamedTempFile>,
}

impl ResolvedFile {
    fn from_path(path: String) -> Self {
        Self {
            path: PathBuf::from(path),
            _guard: None,
        }
    }

    fn from_upload(tmp: NamedTempFile) -> Self {
        let path = tmp.path().to_path_buf();
        Self {
            path,
            _guard: Some(tmp),
        }
    }
}

pub struct ImageUpload {
    pub file: ResolvedFile,
    pub preprocess: PreprocessOpts,
    pub text_opts: TextOpts,
}

#[async_trait]
impl FromRequest<Arc<AppState>> for ImageUpload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(format!("invalid multipart body: {e}")))?;

            let mut file_path: Option<String> = None;
            let mut upload: Option<NamedTempFile> = None;
            let mut preprocess = PreprocessOpts::default();
            let mut text_opts = TextOpts::default();

            while let Some(field) = next_field(&mut multipart).await? {
                match field.name().unwrap_or("") {
                    "file" => upload = Some(save_uploaded_field(field).await?),
                    "file_path" => file_path = Some(text_field(field).await?),
                    "preprocessing_options" => preprocess = parse_json_field(field).await?,
                    "text_processing_options" => text_opts = parse_json_field(field).await?,
                    _ => {}
                }
            }

            Ok(Self {
                file: resolve_upload_or_path(upload, file_path)?,
                preprocess,
                text_opts,
            })
        } else {
            let Json(body): Json<ImageOcrRequest> = Json::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(format!("invalid JSON body: {e}")))?;
            let file_path = require_file_path(body.file_path)?;
            Ok(Self {
                file: ResolvedFile::from_path(file_path),
                preprocess: body.preprocessing_options.unwrap_or_default(),
                text_opts: body.text_processing_options.unwrap_or_default(),
            })
        }
    }
}

pub struct VideoUpload {
    pub file: ResolvedFile,
    pub video_opts: VideoOpts,
    pub preprocess: PreprocessOpts,
}

#[async_trait]
impl FromRequest<Arc<AppState>> for VideoUpload {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(format!("invalid multipart body: {e}")))?;

            let mut file_path: Option<String> = None;
            let mut upload: Option<NamedTempFile> = None;
            let mut video_opts = VideoOpts::default();
            let mut preprocess = PreprocessOpts::default();

            while let Some(field) = next_field(&mut multipart).await? {
                match field.name().unwrap_or("") {
                    "file" => upload = Some(save_uploaded_field(field).await?),
                    "file_path" => file_path = Some(text_field(field).await?),
                    "video_options" => video_opts = parse_json_field(field).await?,
                    "preprocessing_options" => preprocess = parse_json_field(field).await?,
                    _ => {}
                }
            }

            Ok(Self {
                file: resolve_upload_or_path(upload, file_path)?,
                video_opts,
                preprocess,
            })
        } else {
            let Json(body): Json<VideoOcrRequest> = Json::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(format!("invalid JSON body: {e}")))?;
            let file_path = require_file_path(body.file_path)?;
            Ok(Self {
                file: ResolvedFile::from_path(file_path),
                video_opts: body.video_options.unwrap_or_default(),
                preprocess: body.preprocessing_options.unwrap_or_default(),
            })
        }
    }
}

fn require_file_path(file_path: Option<String>) -> Result<String, AppError> {
    file_path.ok_or_else(|| AppError::InvalidRequest("missing required field: file_path".to_string()))
}

fn resolve_upload_or_path(
    upload: Option<NamedTempFile>,
    file_path: Option<String>,
) -> Result<ResolvedFile, AppError> {
    match (upload, file_path) {
        (Some(tmp), _) => Ok(ResolvedFile::from_upload(tmp)),
        (None, Some(path)) => Ok(ResolvedFile::from_path(path)),
        (None, None) => Err(AppError::InvalidRequest(
            "multipart body must include a `file` or `file_path` field".to_string(),
        )),
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, AppError> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("invalid multipart field: {e}")))
}

async fn save_uploaded_field(field: Field<'_>) -> Result<NamedTempFile, AppError> {
    let suffix = field
        .file_name()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| format!(".{ext}"))
        .unwrap_or_default();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("failed to read uploaded file: {e}")))?;

    use std::io::Write;
    let mut tmp = tempfile::Builder::new()
        .prefix("ocrsvc-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp file: {e}")))?;
    tmp.write_all(&bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to write temp file: {e}")))?;
    tmp.flush()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to flush temp file: {e}")))?;
    Ok(tmp)
}

async fn text_field(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("invalid multipart text field: {e}")))
}

async fn parse_json_field<T: serde::de::DeserializeOwned>(field: Field<'_>) -> Result<T, AppError> {
    let text = text_field(field).await?;
    serde_json::from_str(&text).map_err(|e| AppError::InvalidRequest(format!("invalid JSON in multipart field: {e}")))
}
