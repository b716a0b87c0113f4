//! Content-addressed result cache: TTL expiry, LRU eviction, compressed
//! storage, at-most-one-compute coalescing.
//!
//! Grounded in the original service's `CompressedLRUCache`
//! (`gzip.compress`/`OrderedDict`/`move_to_end`), reworked onto the `lru`
//! crate (already a `savant-video` dependency) plus `flate2` for the
//! deflate-family compression spec.md §4.2 calls for.

pub mod key;

pub use key::cache_key;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use lru::LruCache;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

/// A single cached entry: the compressed payload plus bookkeeping the LRU
/// and TTL policies need. `inserted_at` is a monotonic instant, never a
/// wall-clock timestamp, so TTL checks are immune to clock adjustment.
#[derive(Clone)]
pub struct CacheEntry {
    pub key: String,
    pub compressed_payload: Vec<u8>,
    pub inserted_at: Instant,
}

/// Compression level balancing CPU against ratio, matching the original's
/// `compresslevel=6`.
const COMPRESSION_LEVEL: Compression = Compression::new(6);

fn compress(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), COMPRESSION_LEVEL);
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn decompress(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Thread-safe, compressed, TTL+LRU cache keyed by [`cache_key`].
///
/// `T` is whatever result type is being cached (`OCRResult`, `VideoOCRResult`,
/// ...); it only needs to round-trip through JSON.
pub struct ResultCache {
    inner: Mutex<Inner>,
    pending: Mutex<HashMap<String, Arc<Notify>>>,
    max_size: usize,
    ttl: Duration,
    cleanup_probability: f64,
}

impl ResultCache {
    pub fn new(max_size: usize, ttl: Duration, cleanup_probability: f64) -> Self {
        let cap = NonZeroUsize::new(max_size.max(1)).unwrap();
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                hits: 0,
                misses: 0,
            }),
            pending: Mutex::new(HashMap::new()),
            max_size,
            ttl,
            cleanup_probability,
        }
    }

    /// Returns a cached, deserialised value if present and unexpired,
    /// touching its LRU position. A probabilistic sweep of all expired
    /// entries may run as a side effect, per spec.md §4.2.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.maybe_sweep().await;

        let mut inner = self.inner.lock().await;
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => {
                inner.misses += 1;
                return None;
            }
        };
        if expired {
            inner.entries.pop(key);
            inner.misses += 1;
            return None;
        }
        let entry = inner.entries.get(key).cloned();
        drop(inner);

        match entry {
            Some(entry) => match decompress(&entry.compressed_payload) {
                Ok(raw) => match serde_json::from_slice(&raw) {
                    Ok(value) => {
                        self.inner.lock().await.hits += 1;
                        Some(value)
                    }
                    Err(_) => {
                        self.inner.lock().await.misses += 1;
                        None
                    }
                },
                Err(_) => {
                    self.inner.lock().await.misses += 1;
                    None
                }
            },
            None => None,
        }
    }

    /// Inserts a value, compressing it and evicting the LRU entry if the
    /// cache is already at `max_size`.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(value)?;
        let compressed = compress(&raw)?;
        let entry = CacheEntry {
            key: key.to_string(),
            compressed_payload: compressed,
            inserted_at: Instant::now(),
        };

        let mut inner = self.inner.lock().await;
        inner.entries.put(key.to_string(), entry);
        Ok(())
    }

    /// Runs `compute` if `key` is absent, coalescing concurrent callers for
    /// the same key onto a single in-flight computation. Losing callers wait
    /// on the winner's result rather than recomputing (spec.md §4.2
    /// "at-most-one compute"; this is the documented best-effort variant —
    /// a caller that arrives after the winner has already removed its
    /// `Notify` but before the cache write lands will recompute).
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, compute: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }

        let notify = {
            let mut pending = self.pending.lock().await;
            if let Some(existing) = pending.get(key) {
                Some(existing.clone())
            } else {
                pending.insert(key.to_string(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            if let Some(hit) = self.get::<T>(key).await {
                return Ok(hit);
            }
            // Winner's compute failed; fall through and try ourselves.
        }

        let result = compute().await;
        if let Ok(value) = &result {
            let _ = self.put(key, value).await;
        }

        if let Some(notify) = self.pending.lock().await.remove(key) {
            notify.notify_waiters();
        }

        result
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Removes every currently-expired entry, regardless of LRU position.
    pub async fn clear_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let ttl = self.ttl;
        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired_keys {
            inner.entries.pop(k);
        }
        expired_keys.len()
    }

    async fn maybe_sweep(&self) {
        use rand::Rng;
        let roll: f64 = rand::thread_rng().gen();
        if roll < self.cleanup_probability {
            let removed = self.clear_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "probabilistic cache sweep removed expired entries");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = ResultCache::new(10, Duration::from_secs(3600), 0.0);
        cache.put("k1", &"hello".to_string()).await.unwrap();
        let got: Option<String> = cache.get("k1").await;
        assert_eq!(got, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let cache = ResultCache::new(10, Duration::from_millis(1), 0.0);
        cache.put("k1", &"hello".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let got: Option<String> = cache.get("k1").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn lru_evicts_oldest_at_capacity() {
        let cache = ResultCache::new(2, Duration::from_secs(3600), 0.0);
        cache.put("a", &1i32).await.unwrap();
        cache.put("b", &2i32).await.unwrap();
        cache.put("c", &3i32).await.unwrap();
        assert_eq!(cache.get::<i32>("a").await, None);
        assert_eq!(cache.get::<i32>("b").await, Some(2));
        assert_eq!(cache.get::<i32>("c").await, Some(3));
        assert_eq!(cache.stats().await.size, 2);
    }

    #[tokio::test]
    async fn get_or_compute_runs_once_on_miss() {
        let cache = ResultCache::new(10, Duration::from_secs(3600), 0.0);
        let value: i32 = cache
            .get_or_compute("k", || async { Ok(42i32) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        let cached: Option<i32> = cache.get("k").await;
        assert_eq!(cached, Some(42));
    }
}
