//! Content-addressed cache key derivation.
//!
//! `key = H(file_bytes) || H(canonicalised_options_json)`, H = BLAKE2b. The
//! key never contains the file path, only the bytes on disk plus the
//! options that shaped the result — two requests for different paths with
//! identical content and options are the same cache entry.

use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};

type Blake2b128 = Blake2b<U16>;

fn hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Blake2b128::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Builds a cache key from file bytes plus a canonicalised (stable-key-order)
/// JSON encoding of the request options.
pub fn cache_key(file_bytes: &[u8], canonical_options_json: &str) -> String {
    format!(
        "{}{}",
        hash_hex(file_bytes),
        hash_hex(canonical_options_json.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_options_same_key() {
        let a = cache_key(b"hello world", "{}");
        let b = cache_key(b"hello world", "{}");
        assert_eq!(a, b);
    }

    #[test]
    fn different_options_different_key() {
        let a = cache_key(b"hello world", "{\"upscale\":true}");
        let b = cache_key(b"hello world", "{\"upscale\":false}");
        assert_ne!(a, b);
    }

    #[test]
    fn key_never_embeds_raw_bytes() {
        let key = cache_key(b"secret-path-contents", "{}");
        assert!(!key.contains("secret"));
        // two 32-hex-char (16-byte) halves
        assert_eq!(key.len(), 64);
    }
}
