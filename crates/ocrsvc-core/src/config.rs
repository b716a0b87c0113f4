//! Process-wide tunables, loaded from environment with defaults matching
//! spec defaults (several of which were inherited from the Python reference
//! service's `config.py` and are called out below).

use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Fixed worker pool size for the dispatcher.
    pub worker_pool_size: usize,
    /// Deadline for a single-image OCR job.
    pub image_deadline: Duration,
    /// Deadline for one item inside a batch.
    pub batch_item_deadline: Duration,
    /// Deadline for OCR of a single sampled video frame.
    pub video_frame_deadline: Duration,
    /// Upper bound on a batch's internal concurrency, also capped at `N_files`.
    pub batch_semaphore_cap: usize,

    /// Cache entry cap; LRU evicts past this.
    pub cache_max_size: usize,
    /// Cache entry time-to-live.
    pub cache_ttl: Duration,
    /// Probability (0..1) that a completed request triggers an expiry sweep.
    pub cache_cleanup_probability: f64,

    /// Minimum word confidence retained by the Recognizer adapter.
    pub min_ocr_confidence: f32,
    /// Images narrower than this are upscaled before OCR.
    pub min_width_for_ocr: u32,

    /// Threshold for cross-frame text-set deduplication (spec.md §4.6).
    /// Unlike `VideoOpts`, this has no per-request override -- the spec
    /// names it as a clustering constant, not a request dial.
    pub text_dedup_threshold: f64,
    /// Fractional page-width gap that marks a column boundary.
    pub column_gap_fraction: f64,

    /// Max upload size accepted by `/ocr/image` and `/ocr/video`.
    pub max_file_size_mb: u64,
    /// Max number of paths accepted by `/ocr/batch`.
    pub max_batch_size: usize,

    /// Requests slower than this are logged at `warn`.
    pub slow_request_threshold: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: env_or("OCRSVC_WORKER_POOL_SIZE", 8),
            image_deadline: Duration::from_secs(env_or("OCRSVC_IMAGE_DEADLINE_SECS", 30)),
            batch_item_deadline: Duration::from_secs(env_or("OCRSVC_BATCH_ITEM_DEADLINE_SECS", 60)),
            video_frame_deadline: Duration::from_secs(env_or("OCRSVC_VIDEO_FRAME_DEADLINE_SECS", 45)),
            batch_semaphore_cap: env_or("OCRSVC_BATCH_SEMAPHORE_CAP", 8),

            cache_max_size: env_or("OCRSVC_CACHE_MAX_SIZE", 500),
            cache_ttl: Duration::from_secs(env_or("OCRSVC_CACHE_TTL_SECS", 3600)),
            cache_cleanup_probability: env_or("OCRSVC_CACHE_CLEANUP_PROBABILITY", 0.01),

            min_ocr_confidence: env_or("OCRSVC_MIN_OCR_CONFIDENCE", 0.5),
            min_width_for_ocr: env_or("OCRSVC_MIN_WIDTH_FOR_OCR", 800),

            text_dedup_threshold: env_or("OCRSVC_TEXT_DEDUP_THRESHOLD", 0.85),
            column_gap_fraction: env_or("OCRSVC_COLUMN_GAP_FRACTION", 0.1),

            max_file_size_mb: env_or("OCRSVC_MAX_FILE_SIZE_MB", 200),
            max_batch_size: env_or("OCRSVC_MAX_BATCH_SIZE", 50),

            slow_request_threshold: Duration::from_millis(
                (env_or::<f64>("OCRSVC_SLOW_REQUEST_THRESHOLD_SECS", 2.0) * 1000.0) as u64,
            ),
        }
    }
}

pub const SUPPORTED_IMAGE_FORMATS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".tif", ".webp"];
pub const SUPPORTED_VIDEO_FORMATS: &[&str] =
    &[".mp4", ".avi", ".mov", ".mkv", ".wmv", ".flv", ".webm", ".m4v"];
pub const SUPPORTED_DOCUMENT_FORMATS: &[&str] = &[".pdf", ".docx", ".txt", ".rtf"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.worker_pool_size, 8);
        assert_eq!(cfg.cache_max_size, 500);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.min_ocr_confidence, 0.5);
        assert_eq!(cfg.text_dedup_threshold, 0.85);
    }
}
