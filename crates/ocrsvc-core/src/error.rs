//! Error taxonomy shared by every layer of the service.
//!
//! `ServiceError` is the kind, not a type-per-failure zoo: each variant maps
//! to exactly one HTTP status at the API boundary (see `ocrsvc-api::error`).
//! Per-file and per-frame failures are carried as data (`success = false`
//! fields on the result types) rather than as `ServiceError`, so that a
//! single bad file in a batch never unwinds the whole request.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("missing required field: {0}")]
    InputMissing(String),

    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("file too large: {0}")]
    TooLarge(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("processing timed out: {0}")]
    ProcessingTimeout(String),

    #[error("transient I/O error: {0}")]
    TransientIO(String),

    #[error("internal error: {0}")]
    Fatal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Short, stable tag for logging and for embedding in per-item result
    /// failures where a full `ServiceError` would be the wrong shape.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InputMissing(_) => "input_missing",
            ServiceError::InputInvalid(_) => "input_invalid",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::TooLarge(_) => "too_large",
            ServiceError::UnsupportedFormat(_) => "unsupported_format",
            ServiceError::RecognizerUnavailable(_) => "recognizer_unavailable",
            ServiceError::ProcessingTimeout(_) => "processing_timeout",
            ServiceError::TransientIO(_) => "transient_io",
            ServiceError::Fatal(_) => "fatal",
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ServiceError::NotFound(err.to_string()),
            _ => ServiceError::TransientIO(err.to_string()),
        }
    }
}
