//! Recognizer adapter, preprocessing pipeline, and layout reconstruction
//! (spec.md §4.3, §4.4, §4.7), composed into a single [`OcrPipeline`] that
//! the dispatcher crate calls once per image.

pub mod engine;
pub mod layout;
pub mod preprocessor;

pub use engine::{RawWord, Recognizer, RecognizerStatus};
pub use preprocessor::{analyze_quality, ImagePreprocessor, PreprocessorTunables, QualityMetrics};

use ocrsvc_core::{OCRResult, Polygon, PreprocessOpts, TextLine, TextOpts, WordDetail};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct OcrPipeline {
    preprocessor: ImagePreprocessor,
    recognizer: Arc<Recognizer>,
    min_confidence: f32,
    column_gap_fraction: f64,
}

impl OcrPipeline {
    pub fn new(
        recognizer: Arc<Recognizer>,
        tunables: PreprocessorTunables,
        min_confidence: f32,
        column_gap_fraction: f64,
    ) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(tunables),
            recognizer,
            min_confidence,
            column_gap_fraction,
        }
    }

    pub fn recognizer(&self) -> &Arc<Recognizer> {
        &self.recognizer
    }

    /// Runs preprocessing, recognition, confidence filtering, and layout
    /// reconstruction for a single decoded image (spec.md §4.4's
    /// `recognize(image) -> ...` followed by normalisation).
    ///
    /// Preprocessing (Laplacian variance, Hough lines, CLAHE-like tiling) is
    /// pure-Rust CPU work with no native FFI of its own, but it is still
    /// CPU-bound enough that spec.md §5's "CPU-bound work runs on a bounded
    /// OS-thread pool" note applies to it, not just to the recognizer call;
    /// it runs on `spawn_blocking` rather than directly on the async
    /// executor that also services request handling and HTTP I/O.
    pub async fn process_image(
        &self,
        image: &image::DynamicImage,
        preprocess: &PreprocessOpts,
        text_opts: &TextOpts,
    ) -> anyhow::Result<OCRResult> {
        let start = std::time::Instant::now();
        let preprocessor = self.preprocessor.clone();
        let image = image.clone();
        let preprocess_owned = preprocess.clone();
        let processed = tokio::task::spawn_blocking(move || {
            preprocessor.process(&image, &preprocess_owned)
        })
        .await
        .map_err(|e| anyhow::anyhow!("preprocessing task panicked: {e}"))?;
        let raw_words = self.recognizer.recognize_raw(&processed).await?;

        // Words below MinOCRConfidence are dropped before anything downstream
        // sees them (spec.md §4.4, §8).
        let kept: Vec<RawWord> = raw_words
            .into_iter()
            .filter(|w| w.confidence >= self.min_confidence)
            .collect();

        let word_details: Vec<WordDetail> = kept
            .iter()
            .map(|w| WordDetail {
                text: w.text.clone(),
                confidence: w.confidence,
                bbox: w.bbox,
                polygon: Polygon::from_bbox(&w.bbox),
            })
            .collect();

        let text_lines = build_text_lines(&kept);
        let text = layout::reconstruct(&word_details, text_opts, self.column_gap_fraction);

        let confidence = if word_details.is_empty() {
            0.0
        } else {
            word_details.iter().map(|w| w.confidence).sum::<f32>() / word_details.len() as f32
        };

        Ok(OCRResult {
            text,
            confidence,
            processing_time_ms: start.elapsed().as_millis() as u64,
            word_count: word_details.len(),
            line_count: text_lines.len(),
            word_details,
            text_lines,
            success: true,
            error_message: None,
        })
    }
}

/// Groups kept words by Tesseract's `(block, par, line)` key to rebuild
/// `TextLine`s (spec.md §4.4 normalisation).
fn build_text_lines(words: &[RawWord]) -> Vec<TextLine> {
    let mut grouped: BTreeMap<(u32, u32, u32), Vec<&RawWord>> = BTreeMap::new();
    for w in words {
        grouped.entry(w.line_key).or_default().push(w);
    }

    grouped
        .into_values()
        .map(|mut line_words| {
            line_words.sort_by_key(|w| w.bbox.x);
            let bbox = line_words
                .iter()
                .skip(1)
                .fold(line_words[0].bbox, |acc, w| acc.union(&w.bbox));
            let text = line_words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let confidence =
                line_words.iter().map(|w| w.confidence).sum::<f32>() / line_words.len() as f32;
            TextLine {
                text,
                confidence,
                bbox,
                polygon: Polygon::from_bbox(&bbox),
                orientation_angle: 0,
            }
        })
        .collect()
}
