//! Error handling for the API. Maps `ServiceError` to the status codes
//! spec.md §7 assigns to each error kind; a per-file or per-frame failure
//! never reaches this layer since the dispatcher already folds those into
//! `success=false` result fields (spec.md §7 "Propagation policy").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ocrsvc_core::ServiceError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Service(ServiceError::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Service(ServiceError::UnsupportedFormat(_))
            | AppError::Service(ServiceError::InputMissing(_))
            | AppError::Service(ServiceError::InputInvalid(_)) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            // RecognizerUnavailable/ProcessingTimeout/TransientIO never reach this layer
            // (the dispatcher turns them into per-request failure results), but a 500
            // here is the correct fallback if one ever does.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
