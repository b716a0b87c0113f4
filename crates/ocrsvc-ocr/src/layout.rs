//! Spatial text-reconstruction post-processor (spec.md §4.7).
//!
//! No teacher file does anything resembling reading-order reconstruction --
//! `savant-ocr`'s `StructuredContentAnalyzer`/`analyzer.rs` classified text
//! semantically (headers, code, lists) rather than spatially, so this module
//! is new, built from the spec's algorithm directly but kept in the
//! teacher's style: plain functions over `Vec`s, no block graph, an explicit
//! fallback path instead of a `Result` (spec.md §4.7 "any exception in
//! post-processing is swallowed").

use ocrsvc_core::{BBox, ReadingOrder, TextOpts, WordDetail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    SingleColumn,
    MultiColumn,
    Table,
}

struct Block {
    words: Vec<WordDetail>,
    bbox: BBox,
}

impl Block {
    fn text(&self) -> String {
        let mut words = self.words.clone();
        words.sort_by_key(|w| w.bbox.x);
        words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reconstructs reading-order prose from an unordered set of recognised
/// words. Order-independent in its input (spec.md §8): any permutation of
/// the same `words` produces identical output, because the first step sorts
/// by geometry rather than trusting input order.
pub fn reconstruct(words: &[WordDetail], opts: &TextOpts, column_gap_fraction: f64) -> String {
    if words.is_empty() {
        return String::new();
    }
    if !opts.use_advanced {
        return naive_join(words);
    }

    reconstruct_inner(words, opts, column_gap_fraction)
}

fn naive_join(words: &[WordDetail]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn reconstruct_inner(words: &[WordDetail], opts: &TextOpts, column_gap_fraction: f64) -> String {
    let avg_height = {
        let sum: f64 = words.iter().map(|w| w.bbox.height as f64).sum();
        (sum / words.len() as f64).max(1.0)
    };

    let blocks = group_into_blocks(words, avg_height);
    let columns = detect_columns(words, column_gap_fraction);
    let layout = classify_layout(&columns, &blocks, avg_height);

    let mut ordered = blocks;
    sort_blocks(&mut ordered, opts.reading_order);

    let text = match layout {
        Layout::SingleColumn => emit_single_column(&ordered, avg_height),
        Layout::MultiColumn => emit_multi_column(&ordered, &columns, opts.reading_order),
        Layout::Table => emit_table(&ordered, avg_height),
    };

    cleanup(&text)
}

/// Step 1: project word x-extents onto the x-axis, merge overlapping spans,
/// and classify by gap count / table likelihood (spec.md §4.7 step 1).
fn detect_columns(words: &[WordDetail], column_gap_fraction: f64) -> Vec<(i32, i32)> {
    let min_x = words.iter().map(|w| w.bbox.x).min().unwrap_or(0);
    let max_x = words
        .iter()
        .map(|w| w.bbox.x + w.bbox.width)
        .max()
        .unwrap_or(0);
    let page_width = (max_x - min_x).max(1) as f64;
    let gap_threshold = column_gap_fraction * page_width;

    let mut spans: Vec<(i32, i32)> = words
        .iter()
        .map(|w| (w.bbox.x, w.bbox.x + w.bbox.width))
        .collect();
    spans.sort_by_key(|s| s.0);

    let mut merged: Vec<(i32, i32)> = Vec::new();
    for (start, end) in spans {
        if let Some(last) = merged.last_mut() {
            if (start as f64) - (last.1 as f64) <= gap_threshold {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

fn classify_layout(columns: &[(i32, i32)], blocks: &[Block], avg_height: f64) -> Layout {
    if columns.len() <= 1 {
        return Layout::SingleColumn;
    }

    // Table likelihood: >=3 distinct x-origins and >=3 distinct y-origins
    // among blocks, bucketed to half a line height to count as "distinct"
    // rather than every sub-pixel offset.
    let bucket = (avg_height * 0.5).max(1.0);
    let distinct_x: std::collections::HashSet<i64> = blocks
        .iter()
        .map(|b| (b.bbox.x as f64 / bucket).round() as i64)
        .collect();
    let distinct_y: std::collections::HashSet<i64> = blocks
        .iter()
        .map(|b| (b.bbox.y as f64 / bucket).round() as i64)
        .collect();

    if distinct_x.len() >= 3 && distinct_y.len() >= 3 {
        Layout::Table
    } else {
        Layout::MultiColumn
    }
}

/// Step 2: sort words by (y, x), then walk the list grouping successive
/// words into the same block unless the vertical offset exceeds
/// `1.5 * avg_height` (spec.md §4.7 step 2).
fn group_into_blocks(words: &[WordDetail], avg_height: f64) -> Vec<Block> {
    let mut sorted: Vec<&WordDetail> = words.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .y
            .cmp(&b.bbox.y)
            .then(a.bbox.x.cmp(&b.bbox.x))
    });

    let mut blocks: Vec<Block> = Vec::new();
    let gap_limit = 1.5 * avg_height;

    for word in sorted {
        let start_new = match blocks.last() {
            None => true,
            Some(block) => {
                let vertical_gap = (word.bbox.y - (block.bbox.y + block.bbox.height)) as f64;
                vertical_gap > gap_limit
            }
        };

        if start_new {
            blocks.push(Block {
                words: vec![word.clone()],
                bbox: word.bbox,
            });
        } else {
            let block = blocks.last_mut().unwrap();
            block.bbox = block.bbox.union(&word.bbox);
            block.words.push(word.clone());
        }
    }
    blocks
}

/// Step 3: the four reading orders define the sort key on block bbox
/// (spec.md §4.7 step 3).
fn sort_blocks(blocks: &mut [Block], order: ReadingOrder) {
    blocks.sort_by(|a, b| {
        let (ax, ay) = (a.bbox.x, a.bbox.y);
        let (bx, by) = (b.bbox.x, b.bbox.y);
        match order {
            ReadingOrder::LtrTtb => ay.cmp(&by).then(ax.cmp(&bx)),
            ReadingOrder::RtlTtb => ay.cmp(&by).then(bx.cmp(&ax)),
            ReadingOrder::TtbLtr => ax.cmp(&bx).then(ay.cmp(&by)),
            ReadingOrder::TtbRtl => bx.cmp(&ax).then(ay.cmp(&by)),
        }
    });
}

/// Step 4, single column: join with "\n"; a blank line between blocks whose
/// vertical gap exceeds `2.0 * avg_height`.
fn emit_single_column(blocks: &[Block], avg_height: f64) -> String {
    let gap_limit = 2.0 * avg_height;
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let prev = &blocks[i - 1];
            let gap = (block.bbox.y - (prev.bbox.y + prev.bbox.height)) as f64;
            out.push_str(if gap > gap_limit { "\n\n" } else { "\n" });
        }
        out.push_str(&block.text());
    }
    out
}

/// Step 4, multi column: assign each block to the column whose x-interval
/// contains its centre, emit columns in reading order.
fn emit_multi_column(blocks: &[Block], columns: &[(i32, i32)], order: ReadingOrder) -> String {
    let mut by_column: Vec<Vec<&Block>> = vec![Vec::new(); columns.len()];
    for block in blocks {
        let (cx, _) = block.bbox.center();
        let idx = columns
            .iter()
            .enumerate()
            .min_by_key(|(_, (x0, x1))| {
                let mid = (*x0 as f64 + *x1 as f64) / 2.0;
                ((cx - mid).abs() * 1000.0) as i64
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        by_column[idx].push(block);
    }

    let mut column_order: Vec<usize> = (0..columns.len()).collect();
    let ltr = matches!(order, ReadingOrder::LtrTtb | ReadingOrder::TtbLtr);
    if !ltr {
        column_order.reverse();
    }

    column_order
        .into_iter()
        .map(|i| {
            by_column[i]
                .iter()
                .map(|b| b.text())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n--- Column Break ---\n\n")
}

/// Step 4, table: group blocks into rows by near-equal y, sort each row by
/// x, join cells with " | " and rows with "\n".
fn emit_table(blocks: &[Block], avg_height: f64) -> String {
    let row_tolerance = 0.5 * avg_height;
    let mut rows: Vec<Vec<&Block>> = Vec::new();

    for block in blocks {
        let row = rows.iter_mut().find(|row| {
            let ref_y = row[0].bbox.y;
            ((block.bbox.y - ref_y).abs() as f64) < row_tolerance
        });
        match row {
            Some(row) => row.push(block),
            None => rows.push(vec![block]),
        }
    }

    rows.iter_mut().for_each(|row| row.sort_by_key(|b| b.bbox.x));

    rows.iter()
        .map(|row| {
            row.iter()
                .map(|b| b.text())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Step 5: collapse interior whitespace runs to single spaces, collapse
/// three-or-more consecutive newlines to exactly two, trim.
fn cleanup(text: &str) -> String {
    let space_collapsed: String = {
        let mut out = String::with_capacity(text.len());
        let mut last_was_space = false;
        for c in text.chars() {
            if c == ' ' || c == '\t' {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
            } else {
                out.push(c);
                last_was_space = false;
            }
        }
        out
    };

    let mut out = String::with_capacity(space_collapsed.len());
    let mut newline_run = 0;
    for c in space_collapsed.chars() {
        if c == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                out.push(c);
            }
        } else {
            newline_run = 0;
            out.push(c);
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrsvc_core::{BBox, Polygon};

    fn word(text: &str, x: i32, y: i32, w: i32, h: i32) -> WordDetail {
        WordDetail {
            text: text.to_string(),
            confidence: 0.9,
            bbox: BBox { x, y, width: w, height: h },
            polygon: Polygon::from_bbox(&BBox { x, y, width: w, height: h }),
        }
    }

    #[test]
    fn empty_input_yields_empty_text() {
        let opts = TextOpts::default();
        assert_eq!(reconstruct(&[], &opts, 0.1), "");
    }

    #[test]
    fn single_word_round_trips() {
        let words = vec![word("HELLO", 10, 10, 50, 10)];
        let opts = TextOpts::default();
        assert_eq!(reconstruct(&words, &opts, 0.1), "HELLO");
    }

    #[test]
    fn two_lines_join_with_newline() {
        let words = vec![
            word("foo", 0, 10, 20, 10),
            word("bar", 0, 40, 20, 10),
        ];
        let opts = TextOpts {
            use_advanced: true,
            reading_order: ReadingOrder::LtrTtb,
        };
        assert_eq!(reconstruct(&words, &opts, 0.1), "foo\nbar");
    }

    #[test]
    fn reconstruction_is_order_independent() {
        let words = vec![
            word("A", 0, 0, 20, 10),
            word("B", 0, 15, 20, 10),
            word("C", 500, 0, 20, 10),
            word("D", 500, 15, 20, 10),
        ];
        let opts = TextOpts {
            use_advanced: true,
            reading_order: ReadingOrder::LtrTtb,
        };
        let forward = reconstruct(&words, &opts, 0.1);

        let mut reversed = words.clone();
        reversed.reverse();
        let backward = reconstruct(&reversed, &opts, 0.1);

        assert_eq!(forward, backward);
    }

    #[test]
    fn narrow_gap_stays_single_column() {
        let words = vec![
            word("A", 0, 0, 50, 10),
            word("B", 60, 0, 50, 10),
        ];
        let columns = detect_columns(&words, 0.5);
        assert_eq!(columns.len(), 1);
    }
}
