//! Shared types, error taxonomy and configuration for the OCR service.
//!
//! Every crate in the workspace (cache, ocr, video, documents, dispatch, api)
//! depends on this one for the request/response shapes and the `ServiceError`
//! kind they all propagate.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
