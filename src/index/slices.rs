//! Slice generation.
//!
//! Anchors take precedence: one slice per normalized anchor. Files without
//! anchors are chunked into consecutive `chunk_<start>` ranges when they
//! exceed the line threshold.

use super::{Anchor, Slice};

/// Create per-file slices from anchors or by chunking.
///
/// - When anchors are present they are clamped to `[1, total_lines]`,
///   sorted, deduplicated, and emitted one slice each.
/// - With no anchors and `max_file_lines == 0` the whole file becomes a
///   single `chunk_1` slice.
/// - With no anchors and `total_lines <= max_file_lines`, no slices.
/// - Otherwise consecutive `chunk_<start>` slices of width `max_file_lines`
///   cover the file, the last possibly shorter.
pub fn build_slices(
    rel_path: &str,
    anchors: &[Anchor],
    total_lines: usize,
    max_file_lines: usize,
) -> Vec<Slice> {
    let total_lines = total_lines.max(1);

    if !anchors.is_empty() {
        return normalize_for_slices(anchors, total_lines)
            .into_iter()
            .map(|a| Slice {
                path: rel_path.into(),
                name: a.name,
                start: a.start,
                end: a.end,
                summary: String::new(),
            })
            .collect();
    }

    if max_file_lines == 0 {
        return vec![Slice {
            path: rel_path.into(),
            name: "chunk_1".into(),
            start: 1,
            end: total_lines,
            summary: String::new(),
        }];
    }
    if total_lines <= max_file_lines {
        return Vec::new();
    }

    let mut slices = Vec::new();
    let mut start = 1;
    while start <= total_lines {
        let end = (start + max_file_lines - 1).min(total_lines);
        slices.push(Slice {
            path: rel_path.into(),
            name: format!("chunk_{start}"),
            start,
            end,
            summary: String::new(),
        });
        start += max_file_lines;
    }
    slices
}

fn normalize_for_slices(input: &[Anchor], total: usize) -> Vec<Anchor> {
    let mut out: Vec<Anchor> = input
        .iter()
        .map(|a| {
            let start = a.start.max(1).min(total);
            let end = a.end.max(start).min(total);
            Anchor {
                name: a.name.clone(),
                start,
                end,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        (a.start, a.end, a.name.as_str()).cmp(&(b.start, b.end, b.name.as_str()))
    });
    out.dedup_by(|a, b| a.name == b.name && a.start == b.start && a.end == b.end);
    out
}
