//! Jump pointers from anchors and symbols.
//!
//! Pointer ids are stable and unique within a bundle:
//!
//! - Anchor pointers: `<relPath with '/'→'-'>#<slug(anchorName)>`
//! - Symbol pointers: `<qname with '.'→'-'>`
//!
//! Duplicate base ids receive numeric suffixes `-2`, `-3`, ... in encounter
//! order; the first occurrence stays unsuffixed.

use std::collections::HashMap;

use super::{Anchor, Pointer, Symbol};

/// Create jump pointers for the anchors of one file, sorted by
/// `(start, end, name)` before id assignment. `sym` stays empty for
/// anchor-backed pointers.
pub fn build_anchor_pointers(rel_path: &str, anchors: &[Anchor]) -> Vec<Pointer> {
    if anchors.is_empty() {
        return Vec::new();
    }
    let mut sorted = anchors.to_vec();
    sorted.sort_by(|a, b| {
        (a.start, a.end, a.name.as_str()).cmp(&(b.start, b.end, b.name.as_str()))
    });

    let base = rel_path.replace('/', "-");
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(sorted.len());
    for a in &sorted {
        let start = a.start.max(1);
        let end = a.end.max(start);
        let base_id = format!("{base}#{}", slugify_anchor(&a.name));
        out.push(Pointer {
            id: unique_id(&mut seen, base_id),
            path: rel_path.into(),
            sym: String::new(),
            start,
            end,
        });
    }
    out
}

/// Create jump pointers from a flat list of symbols. Symbols are sorted by
/// `(qname, path, start, end)` so id suffixes are deterministic; empty
/// qnames are skipped. The final emit order is `(id, path, start, end)`.
pub fn build_symbol_pointers(symbols: &[Symbol]) -> Vec<Pointer> {
    if symbols.is_empty() {
        return Vec::new();
    }
    let mut sorted = symbols.to_vec();
    sorted.sort_by(|a, b| {
        (a.qname.as_str(), a.path.as_str(), a.start, a.end)
            .cmp(&(b.qname.as_str(), b.path.as_str(), b.start, b.end))
    });

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(sorted.len());
    for s in &sorted {
        if s.qname.is_empty() {
            continue;
        }
        let base_id = s.qname.replace('.', "-");
        let start = s.start.max(1);
        let end = s.end.max(start);
        out.push(Pointer {
            id: unique_id(&mut seen, base_id),
            path: s.path.clone(),
            sym: s.qname.clone(),
            start,
            end,
        });
    }

    out.sort_by(|a, b| {
        (a.id.as_str(), a.path.as_str(), a.start, a.end)
            .cmp(&(b.id.as_str(), b.path.as_str(), b.start, b.end))
    });
    out
}

/// Counter rule: the counter is keyed by the unsuffixed base id. The first
/// occurrence keeps the base id; later duplicates get `-2`, `-3`, ...
fn unique_id(seen: &mut HashMap<String, usize>, base_id: String) -> String {
    let count = seen.entry(base_id.clone()).or_insert(0);
    *count += 1;
    if *count > 1 {
        format!("{base_id}-{count}")
    } else {
        base_id
    }
}

/// Normalize an anchor name for use in pointer ids: keep
/// `[A-Za-z0-9._-]`, map every other rune to '-', collapse consecutive
/// dashes, trim leading/trailing dashes, and fall back to "anchor" when
/// nothing remains. Case is preserved.
pub fn slugify_anchor(name: &str) -> String {
    if name.is_empty() {
        return "anchor".into();
    }
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "anchor".into()
    } else {
        trimmed.to_string()
    }
}
