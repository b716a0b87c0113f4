//! Bounded-concurrency OCR dispatcher (spec.md §4.1, §5): accepts image,
//! batch, and video jobs, enforces a global worker-pool ceiling, serialises
//! the Recognizer through `ocrsvc-ocr`'s own mutex, and coalesces identical
//! work through `ocrsvc-cache`.
//!
//! Grounded in the teacher's `savant-video::processor` command/event
//! pipeline for the shape of "channel in, bounded work, channel out", but
//! rebuilt around `tokio::sync::Semaphore` + `tokio::spawn` rather than a
//! dedicated actor task, since spec.md's per-job, per-file semantics (§5
//! "Ordering... within a batch, per-file results appear in the same order as
//! the input file_paths") are simplest to express as a `Vec` of join handles
//! awaited in input order.

mod metrics;
mod path_guard;

pub use metrics::{MetricsSnapshot, PerformanceMetrics};

use ocrsvc_core::{
    BatchOCRResult, DocumentExtractionResult, OCRResult, PreprocessOpts, ServiceConfig,
    ServiceError, ServiceResult, TextOpts, VideoOCRResult, VideoOpts, SUPPORTED_DOCUMENT_FORMATS,
    SUPPORTED_IMAGE_FORMATS, SUPPORTED_VIDEO_FORMATS,
};
use ocrsvc_documents::DocumentRegistry;
use ocrsvc_ocr::{OcrPipeline, RecognizerStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::warn;

/// Turns a structural [`ServiceError`] into the short, user-facing message
/// spec.md §8 scenario 4 expects inside a per-file batch result
/// (`error_message="File not found"`), rather than the more verbose
/// `Display` text meant for logs.
fn error_message_for(err: &ServiceError) -> String {
    match err {
        ServiceError::NotFound(_) => "File not found".to_string(),
        ServiceError::TooLarge(_) => "File too large".to_string(),
        ServiceError::UnsupportedFormat(_) => "Unsupported file format".to_string(),
        other => other.to_string(),
    }
}

struct Inner {
    pipeline: Arc<OcrPipeline>,
    cache: Arc<ocrsvc_cache::ResultCache>,
    documents: Arc<DocumentRegistry>,
    config: ServiceConfig,
    pool_semaphore: Arc<Semaphore>,
    metrics: PerformanceMetrics,
}

/// Owns the Cache and Recognizer as shared, long-lived collaborators (spec.md
/// §3 "Ownership"). Cheap to clone -- every field lives behind one `Arc`.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(pipeline: Arc<OcrPipeline>, documents: Arc<DocumentRegistry>, config: ServiceConfig) -> Self {
        let cache = Arc::new(ocrsvc_cache::ResultCache::new(
            config.cache_max_size,
            config.cache_ttl,
            config.cache_cleanup_probability,
        ));
        let pool_semaphore = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            inner: Arc::new(Inner {
                pipeline,
                cache,
                documents,
                config,
                pool_semaphore,
                metrics: PerformanceMetrics::new(),
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub async fn recognizer_status(&self) -> RecognizerStatus {
        self.inner.pipeline.recognizer().status().await
    }

    /// Runs a small synthetic recognition once at startup so the first real
    /// request doesn't pay Tesseract's lazy-init cost (spec.md §4.4).
    pub async fn warm_up(&self) -> anyhow::Result<()> {
        self.inner.pipeline.recognizer().warm_up().await
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        let cache_stats = self.inner.cache.stats().await;
        self.inner.metrics.snapshot(cache_stats).await
    }

    fn max_file_size_bytes(&self) -> u64 {
        self.inner.config.max_file_size_mb * 1024 * 1024
    }

    /// `submit_image(path, PreprocessOpts, TextOpts) -> OCRResult` (spec.md
    /// §4.1). Structural problems (missing file, unsupported format, too
    /// large) propagate as [`ServiceError`] so the HTTP layer can map them to
    /// 404/400/413; everything past that point -- recognizer failure,
    /// deadline expiry -- comes back as `Ok(OCRResult { success: false, .. })`
    /// per spec.md §7's propagation policy.
    pub async fn submit_image(
        &self,
        path: &Path,
        preprocess: &PreprocessOpts,
        text_opts: &TextOpts,
    ) -> ServiceResult<OCRResult> {
        let start = Instant::now();
        let result = self
            .run_image_job(
                path,
                preprocess,
                text_opts,
                self.inner.config.image_deadline,
                self.max_file_size_bytes(),
            )
            .await;

        match &result {
            Ok(r) => {
                self.inner
                    .metrics
                    .record_image(start.elapsed().as_secs_f64() * 1000.0);
                if !r.success {
                    self.inner.metrics.record_error();
                }
            }
            Err(_) => self.inner.metrics.record_error(),
        }
        self.log_if_slow(path, start.elapsed());
        result
    }

    /// `submit_batch(paths[], ...) -> BatchOCRResult` (spec.md §4.1). Never
    /// fails wholesale: a per-file [`ServiceError`] becomes a failure entry
    /// at that file's index, and the batch-internal semaphore caps
    /// concurrency at `min(8, N_files)` so one huge batch can't starve the
    /// rest of the pool.
    pub async fn submit_batch(
        &self,
        paths: &[PathBuf],
        preprocess: &PreprocessOpts,
        text_opts: &TextOpts,
    ) -> BatchOCRResult {
        let start = Instant::now();
        let max_bytes = self.max_file_size_bytes();
        let deadline = self.inner.config.batch_item_deadline;
        let cap = self.inner.config.batch_semaphore_cap.min(paths.len().max(1));
        let batch_semaphore = Arc::new(Semaphore::new(cap.max(1)));

        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            let this = self.clone();
            let path = path.clone();
            let preprocess = preprocess.clone();
            let text_opts = text_opts.clone();
            let batch_semaphore = batch_semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = batch_semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed");
                this.run_image_job(&path, &preprocess, &text_opts, deadline, max_bytes)
                    .await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(Ok(r)) => r,
                Ok(Err(service_err)) => OCRResult::failure(error_message_for(&service_err)),
                Err(join_err) => OCRResult::failure(format!("subjob task panicked: {join_err}")),
            };
            results.push(result);
        }

        let files_failed = results.iter().filter(|r| !r.success).count();
        let files_processed = results.len() - files_failed;

        self.inner.metrics.record_batch();
        let elapsed = start.elapsed();
        if elapsed > self.inner.config.slow_request_threshold {
            warn!(files = paths.len(), elapsed_ms = elapsed.as_millis(), "slow batch OCR request");
        }

        BatchOCRResult {
            total_processing_time_ms: elapsed.as_millis() as u64,
            files_processed,
            files_failed,
            results,
        }
    }

    /// `submit_video(path, VideoOpts, PreprocessOpts) -> VideoOCRResult`
    /// (spec.md §4.1). Only "can't open the video" and structural problems
    /// surface as [`ServiceError`]; per-frame OCR failures are already
    /// absorbed inside `ocrsvc_video::sample_video`.
    pub async fn submit_video(
        &self,
        path: &Path,
        video_opts: &VideoOpts,
        preprocess: &PreprocessOpts,
    ) -> ServiceResult<VideoOCRResult> {
        let start = Instant::now();
        let result = self
            .run_video_job(path, video_opts, preprocess, self.max_file_size_bytes())
            .await;

        match &result {
            Ok(r) => {
                self.inner
                    .metrics
                    .record_video(start.elapsed().as_secs_f64() * 1000.0, r.frames_processed);
                if !r.success {
                    self.inner.metrics.record_error();
                }
            }
            Err(_) => self.inner.metrics.record_error(),
        }
        self.log_if_slow(path, start.elapsed());
        result
    }

    /// `extract(path) -> {text, file_type, metadata, success, error?}`
    /// (spec.md §6). Delegated entirely to the document-adapter registry,
    /// which never raises.
    pub async fn extract_document(&self, path: &Path) -> ServiceResult<DocumentExtractionResult> {
        path_guard::validate(path, SUPPORTED_DOCUMENT_FORMATS, self.max_file_size_bytes()).await?;
        let result = self.inner.documents.extract(path).await;
        self.inner.metrics.record_document();
        Ok(result)
    }

    fn log_if_slow(&self, path: &Path, elapsed: Duration) {
        if elapsed > self.inner.config.slow_request_threshold {
            warn!(path = %path.display(), elapsed_ms = elapsed.as_millis(), "slow OCR request");
        }
    }

    /// Shared by `submit_image` and each batch subjob. Structural validation
    /// happens up front (outside the cache/pool path); everything past that
    /// runs inside a detached task so that deadline expiry never aborts an
    /// in-flight native OCR call -- spec.md §5 "in-flight native OCR calls
    /// are not interruptible and run to completion; their results are
    /// discarded". Dropping the `JoinHandle` on timeout does exactly that:
    /// the spawned task keeps running (and, if it is the cache's coalescing
    /// winner, still populates the cache and wakes other waiters), while this
    /// call returns a failure result immediately.
    async fn run_image_job(
        &self,
        path: &Path,
        preprocess: &PreprocessOpts,
        text_opts: &TextOpts,
        deadline: Duration,
        max_bytes: u64,
    ) -> ServiceResult<OCRResult> {
        let call_start = Instant::now();
        path_guard::validate(path, SUPPORTED_IMAGE_FORMATS, max_bytes).await?;
        let file_bytes = tokio::fs::read(path).await.map_err(ServiceError::from)?;

        let options_json = serde_json::to_string(&(preprocess, text_opts)).unwrap_or_default();
        let key = format!("image:{}", ocrsvc_cache::cache_key(&file_bytes, &options_json));

        let pipeline = self.inner.pipeline.clone();
        let cache = self.inner.cache.clone();
        let semaphore = self.inner.pool_semaphore.clone();
        let preprocess = preprocess.clone();
        let text_opts = text_opts.clone();

        let handle = tokio::spawn(async move {
            cache
                .get_or_compute(&key, move || async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| anyhow::anyhow!("worker pool semaphore closed: {e}"))?;
                    let image = image::load_from_memory(&file_bytes)
                        .map_err(|e| anyhow::anyhow!("failed to decode image: {e}"))?;
                    pipeline.process_image(&image, &preprocess, &text_opts).await
                })
                .await
        });

        match tokio::time::timeout(deadline, handle).await {
            // The cached payload is bit-identical on a hit (spec.md §8); only
            // `processing_time_ms` is re-stamped to this call's own elapsed
            // time so a hit reports its own fast latency rather than the
            // compute that originally populated the cache.
            Ok(Ok(Ok(mut result))) => {
                result.processing_time_ms = call_start.elapsed().as_millis() as u64;
                Ok(result)
            }
            Ok(Ok(Err(e))) => Ok(OCRResult::failure(format!("OCR failed: {e}"))),
            Ok(Err(join_err)) => Ok(OCRResult::failure(format!("OCR task panicked: {join_err}"))),
            Err(_) => Ok(OCRResult::failure(format!(
                "processing exceeded {:?} deadline",
                deadline
            ))),
        }
    }

    /// Same detached-task-plus-timeout shape as [`Dispatcher::run_image_job`],
    /// but without an outer deadline of its own: spec.md §4.1 only names a
    /// per-frame video deadline (applied inside `sample_video`), not a
    /// whole-job one.
    async fn run_video_job(
        &self,
        path: &Path,
        video_opts: &VideoOpts,
        preprocess: &PreprocessOpts,
        max_bytes: u64,
    ) -> ServiceResult<VideoOCRResult> {
        let call_start = Instant::now();
        path_guard::validate(path, SUPPORTED_VIDEO_FORMATS, max_bytes).await?;
        let file_bytes = tokio::fs::read(path).await.map_err(ServiceError::from)?;

        let options_json = serde_json::to_string(&(video_opts, preprocess)).unwrap_or_default();
        let key = format!("video:{}", ocrsvc_cache::cache_key(&file_bytes, &options_json));

        let pipeline = self.inner.pipeline.clone();
        let cache = self.inner.cache.clone();
        let pool_semaphore = self.inner.pool_semaphore.clone();
        let video_opts = video_opts.clone();
        let preprocess = preprocess.clone();
        let path_owned = path.to_path_buf();
        let sampler_config = ocrsvc_video::SamplerConfig {
            frame_deadline: self.inner.config.video_frame_deadline,
            text_dedup_threshold: self.inner.config.text_dedup_threshold,
        };

        let handle = tokio::spawn(async move {
            cache
                .get_or_compute(&key, move || async move {
                    let _permit = pool_semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| anyhow::anyhow!("worker pool semaphore closed: {e}"))?;
                    ocrsvc_video::sample_video(
                        &path_owned,
                        &video_opts,
                        &preprocess,
                        &pipeline,
                        &sampler_config,
                    )
                    .await
                })
                .await
        });

        match handle.await {
            // Same re-stamping as `run_image_job`: the cache returns the
            // original compute's payload verbatim, but this call's own
            // elapsed time is what `processing_time_ms` must report.
            Ok(Ok(mut result)) => {
                result.processing_time_ms = call_start.elapsed().as_millis() as u64;
                Ok(result)
            }
            Ok(Err(e)) => Ok(VideoOCRResult::failure(format!("video OCR failed: {e}"))),
            Err(join_err) => Ok(VideoOCRResult::failure(format!("video task panicked: {join_err}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrsvc_ocr::engine::Recognizer;
    use ocrsvc_ocr::preprocessor::PreprocessorTunables;

    fn test_dispatcher() -> Dispatcher {
        let recognizer = Recognizer::new(vec!["eng".to_string()]);
        let pipeline = Arc::new(OcrPipeline::new(
            recognizer,
            PreprocessorTunables::default(),
            0.5,
            0.1,
        ));
        let documents = Arc::new(DocumentRegistry::with_defaults());
        Dispatcher::new(pipeline, documents, ServiceConfig::default())
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dispatcher = test_dispatcher();
        let err = dispatcher
            .submit_image(
                Path::new("/nonexistent/path/image.png"),
                &PreprocessOpts::default(),
                &TextOpts::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let dispatcher = test_dispatcher();
        let tmp = tempfile::Builder::new().suffix(".xyz").tempfile().unwrap();
        let err = dispatcher
            .submit_image(tmp.path(), &PreprocessOpts::default(), &TextOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn batch_preserves_order_and_reports_each_failure_kind() {
        let dispatcher = test_dispatcher();
        let unsupported = tempfile::Builder::new().suffix(".xyz").tempfile().unwrap();

        let paths = vec![
            PathBuf::from("/nonexistent/one.png"),
            unsupported.path().to_path_buf(),
            PathBuf::from("/nonexistent/two.png"),
        ];

        let batch = dispatcher
            .submit_batch(&paths, &PreprocessOpts::default(), &TextOpts::default())
            .await;

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.files_failed, 3);
        assert_eq!(batch.files_processed, 0);
        assert_eq!(batch.results[0].error_message.as_deref(), Some("File not found"));
        assert_eq!(
            batch.results[1].error_message.as_deref(),
            Some("Unsupported file format")
        );
        assert_eq!(batch.results[2].error_message.as_deref(), Some("File not found"));
    }

    #[tokio::test]
    async fn document_extraction_of_txt_file_succeeds() {
        let dispatcher = test_dispatcher();
        let mut tmp = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        use std::io::Write;
        tmp.write_all(b"plain text contents").unwrap();

        let result = dispatcher.extract_document(tmp.path()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.text, "plain text contents");
    }

    #[tokio::test]
    async fn recognizer_starts_not_initialized() {
        let dispatcher = test_dispatcher();
        assert_eq!(dispatcher.recognizer_status().await, RecognizerStatus::NotInitialized);
    }
}
