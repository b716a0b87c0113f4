//! Thread-safe performance counters exposed at `/metrics` (spec.md §5
//! "PerformanceMetrics", SPEC_FULL.md §3 supplementing it from the original's
//! `utils/performance.py`). Counters are plain atomics; the rolling latency
//! window is a mutex-guarded `VecDeque` bounded to the last 1000 samples, as
//! spec.md §5 requires.

use ocrsvc_cache::CacheStats;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const MAX_LATENCY_SAMPLES: usize = 1000;

#[derive(Debug, Default, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub images_processed: u64,
    pub batches_processed: u64,
    pub videos_processed: u64,
    pub frames_processed_from_videos: u64,
    pub documents_processed: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_size: usize,
    pub cache_max_size: usize,
    pub avg_latency_ms: f64,
    pub sample_count: usize,
}

pub struct PerformanceMetrics {
    images_processed: AtomicU64,
    batches_processed: AtomicU64,
    videos_processed: AtomicU64,
    frames_processed_from_videos: AtomicU64,
    documents_processed: AtomicU64,
    errors: AtomicU64,
    latencies_ms: Mutex<VecDeque<f64>>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            images_processed: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            videos_processed: AtomicU64::new(0),
            frames_processed_from_videos: AtomicU64::new(0),
            documents_processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latencies_ms: Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES)),
        }
    }

    pub fn record_image(&self, elapsed_ms: f64) {
        self.images_processed.fetch_add(1, Ordering::Relaxed);
        self.push_latency_blocking(elapsed_ms);
    }

    pub fn record_batch(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_video(&self, elapsed_ms: f64, frames_processed: usize) {
        self.videos_processed.fetch_add(1, Ordering::Relaxed);
        self.frames_processed_from_videos
            .fetch_add(frames_processed as u64, Ordering::Relaxed);
        self.push_latency_blocking(elapsed_ms);
    }

    pub fn record_document(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Pushes onto the bounded latency window. Called from async contexts
    /// only, so a blocking-free `try_lock`-then-fallback keeps this cheap on
    /// the hot path without requiring every caller to `.await`.
    fn push_latency_blocking(&self, sample_ms: f64) {
        if let Ok(mut latencies) = self.latencies_ms.try_lock() {
            if latencies.len() >= MAX_LATENCY_SAMPLES {
                latencies.pop_front();
            }
            latencies.push_back(sample_ms);
        }
    }

    pub async fn snapshot(&self, cache: CacheStats) -> MetricsSnapshot {
        let latencies = self.latencies_ms.lock().await;
        let sample_count = latencies.len();
        let avg_latency_ms = if sample_count == 0 {
            0.0
        } else {
            latencies.iter().sum::<f64>() / sample_count as f64
        };

        MetricsSnapshot {
            images_processed: self.images_processed.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            videos_processed: self.videos_processed.load(Ordering::Relaxed),
            frames_processed_from_videos: self
                .frames_processed_from_videos
                .load(Ordering::Relaxed),
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            cache_size: cache.size,
            cache_max_size: cache.max_size,
            avg_latency_ms,
            sample_count,
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_reflects_recorded_samples() {
        let metrics = PerformanceMetrics::new();
        metrics.record_image(10.0);
        metrics.record_image(20.0);
        let snapshot = metrics
            .snapshot(CacheStats {
                size: 1,
                max_size: 10,
                hits: 2,
                misses: 1,
            })
            .await;
        assert_eq!(snapshot.images_processed, 2);
        assert_eq!(snapshot.sample_count, 2);
        assert!((snapshot.avg_latency_ms - 15.0).abs() < 1e-9);
        assert_eq!(snapshot.cache_hits, 2);
    }

    #[tokio::test]
    async fn latency_window_is_bounded() {
        let metrics = PerformanceMetrics::new();
        for i in 0..(MAX_LATENCY_SAMPLES + 50) {
            metrics.record_image(i as f64);
        }
        let snapshot = metrics
            .snapshot(CacheStats::default())
            .await;
        assert_eq!(snapshot.sample_count, MAX_LATENCY_SAMPLES);
    }
}
