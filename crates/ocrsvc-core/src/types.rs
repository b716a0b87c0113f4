//! The request/response data model shared by every crate in the workspace.
//!
//! Field names track the original Python service's `models.py` closely
//! enough that the JSON wire format is unsurprising, but every dial here is
//! a plain Rust enum/struct rather than a permissive dict.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Image-enhancement dials. Immutable for the lifetime of one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessOpts {
    pub enhance_contrast: bool,
    pub denoise: bool,
    pub threshold_method: ThresholdMethod,
    pub apply_morphology: bool,
    pub deskew: bool,
    pub upscale: bool,
}

impl Default for PreprocessOpts {
    fn default() -> Self {
        Self {
            enhance_contrast: true,
            denoise: true,
            threshold_method: ThresholdMethod::AdaptiveGaussian,
            apply_morphology: true,
            deskew: true,
            upscale: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    None,
    Otsu,
    AdaptiveGaussian,
    AdaptiveMean,
}

/// Layout-reconstruction dials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextOpts {
    pub use_advanced: bool,
    pub reading_order: ReadingOrder,
}

impl Default for TextOpts {
    fn default() -> Self {
        Self {
            use_advanced: true,
            reading_order: ReadingOrder::LtrTtb,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadingOrder {
    LtrTtb,
    RtlTtb,
    TtbLtr,
    TtbRtl,
}

/// Frame-sampling dials for video OCR.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoOpts {
    pub frame_interval: u32,
    pub similarity_threshold: f64,
    pub min_confidence: f32,
    pub max_frames: u32,
}

impl Default for VideoOpts {
    fn default() -> Self {
        Self {
            frame_interval: 5,
            similarity_threshold: 0.98,
            min_confidence: 0.6,
            max_frames: 1000,
        }
    }
}

/// Axis-aligned rectangle in integer pixel space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// The smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        BBox {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// Four-point quadrilateral, clockwise from top-left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Polygon(pub Vec<(i32, i32)>);

impl Polygon {
    pub fn from_bbox(bbox: &BBox) -> Self {
        Polygon(vec![
            (bbox.x, bbox.y),
            (bbox.x + bbox.width, bbox.y),
            (bbox.x + bbox.width, bbox.y + bbox.height),
            (bbox.x, bbox.y + bbox.height),
        ])
    }
}

/// One recognised token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordDetail {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
    pub polygon: Polygon,
}

/// One recognised line (a run of words sharing a baseline).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
    pub polygon: Polygon,
    pub orientation_angle: i32,
}

/// Output of a single-image OCR call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OCRResult {
    pub text: String,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub word_details: Vec<WordDetail>,
    pub text_lines: Vec<TextLine>,
    pub word_count: usize,
    pub line_count: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

impl OCRResult {
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }
}

/// Output of a batch OCR call. Order matches the order of `file_paths` in
/// the request; a failed item never fails the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchOCRResult {
    pub results: Vec<OCRResult>,
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_processing_time_ms: u64,
}

/// Output of a video OCR call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VideoOCRResult {
    pub text: String,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub frames_processed: usize,
    pub frames_with_text: usize,
    pub unique_text_segments: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

impl VideoOCRResult {
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }
}

/// Result of the document-extraction adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocumentExtractionResult {
    pub text: String,
    pub file_type: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub success: bool,
    pub error_message: Option<String>,
}
