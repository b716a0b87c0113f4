//! Cross-frame text-set deduplication (spec.md §4.6).
//!
//! No teacher file does lexical deduplication across OCR passes (closest
//! relative in the pack is `screensearch-capture::frame_diff` for *image*
//! similarity); this module implements the spec's hybrid metric directly,
//! grounded in plain-Rust idioms the pack favours elsewhere (`HashSet`
//! intersections for Jaccard, a classic DP table for Levenshtein).

use std::collections::HashSet;

const LEV_PREFIX_CHARS: usize = 200;

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn word_set(s: &str) -> HashSet<&str> {
    s.split_whitespace().collect()
}

fn jaccard(a: &str, b: &str) -> f64 {
    let wa = word_set(a);
    let wb = word_set(b);
    if wa.is_empty() && wb.is_empty() {
        return 1.0;
    }
    let union = wa.union(&wb).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    intersection as f64 / union as f64
}

/// Levenshtein edit distance, classic two-row DP.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `sim(a,b)` from spec.md §4.6, with its short-circuits evaluated in order.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);

    if na == nb {
        return 1.0;
    }
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }

    let (la, lb) = (na.chars().count(), nb.chars().count());
    let length_ratio = la.min(lb) as f64 / la.max(lb) as f64;
    if length_ratio < 0.3 {
        return 0.0;
    }

    let j = jaccard(&na, &nb);
    if j < 0.1 {
        return j;
    }

    let ta: String = na.chars().take(LEV_PREFIX_CHARS).collect();
    let tb: String = nb.chars().take(LEV_PREFIX_CHARS).collect();
    let max_len = ta.chars().count().max(tb.chars().count()).max(1) as f64;
    let lev_similarity = 1.0 - levenshtein(&ta, &tb) as f64 / max_len;

    0.3 * j + 0.7 * lev_similarity
}

/// Collapses near-duplicate strings using `threshold` as the acceptance
/// cutoff (spec.md §4.6 "Clustering"). Candidates are compared in
/// descending-length order so that a cluster's accepted representative is
/// its longest member, but the returned list is reordered back to the
/// *first-occurrence* order of `texts` -- matching spec.md §4.5's "text list
/// is deduplicated preserving first-occurrence order of unique strings".
pub fn dedup(texts: &[String], threshold: f64) -> Vec<String> {
    let mut by_length: Vec<usize> = (0..texts.len()).collect();
    by_length.sort_by_key(|&i| std::cmp::Reverse(texts[i].chars().count()));

    let mut accepted: Vec<usize> = Vec::new();
    for i in by_length {
        let is_duplicate = accepted
            .iter()
            .any(|&j| similarity(&texts[i], &texts[j]) >= threshold);
        if !is_duplicate {
            accepted.push(i);
        }
    }

    accepted.sort_unstable();
    accepted.into_iter().map(|i| texts[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_similarity_one() {
        assert_eq!(similarity("Hello World", "hello world"), 1.0);
    }

    #[test]
    fn empty_string_is_similarity_zero() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("anything", ""), 0.0);
    }

    #[test]
    fn wildly_different_lengths_are_similarity_zero() {
        assert_eq!(similarity("hi", "a very long sentence that goes on and on"), 0.0);
    }

    #[test]
    fn dedup_is_idempotent() {
        let texts = vec![
            "the quick brown fox".to_string(),
            "the quick brown fox jumps".to_string(),
            "completely unrelated content here".to_string(),
        ];
        let once = dedup(&texts, 0.85);
        let twice = dedup(&once, 0.85);
        assert_eq!(once, twice);
    }

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let texts = vec![
            "alpha beta gamma".to_string(),
            "delta epsilon zeta".to_string(),
            "alpha beta gamma".to_string(),
        ];
        let result = dedup(&texts, 0.85);
        assert_eq!(result, vec!["alpha beta gamma", "delta epsilon zeta"]);
    }
}
