//! Region anchor extraction.
//!
//! Anchors are declared with paired markers and mapped to 1-based inclusive
//! line ranges. Supported forms (case-insensitive):
//!
//! - Line comments: `// region NAME` | `// region: NAME`
//! - Preprocessor:  `#region NAME` | `#endregion NAME` (C#/TS style)
//! - Block markers: `/* region: NAME */` | `/* endregion: NAME */`
//!
//! Nested regions are supported, even with identical names (a stack per
//! name). Unmatched opens are silently dropped, duplicates from multiple
//! syntaxes are de-duplicated, and the output is sorted by (start, end,
//! name).

use once_cell::sync::Lazy;
use regex::Regex;

use super::Anchor;
use crate::textutil::line_of;

static RE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*//\s*(region|endregion)\s*:?\s*([A-Za-z0-9_.\-]+)\s*$").unwrap()
});
static RE_HASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*#\s*(region|endregion)\s*:?\s*([A-Za-z0-9_.\-]+)\s*$").unwrap()
});
static RE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)/\*\s*(region|endregion)\s*:?\s*([A-Za-z0-9_.\-]+)\s*\*/").unwrap()
});

/// Extract region anchors from a file body.
pub fn extract_anchors(text: &str) -> Vec<Anchor> {
    let mut raw = parse_line_markers(text);
    raw.extend(parse_block_markers(text));
    if raw.is_empty() {
        return raw;
    }
    for anchor in &mut raw {
        normalize(anchor);
    }
    let mut merged = dedup(raw);
    merged.sort_by(|a, b| {
        (a.start, a.end, a.name.as_str()).cmp(&(b.start, b.end, b.name.as_str()))
    });
    merged
}

fn parse_line_markers(text: &str) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let mut starts_by_name: std::collections::HashMap<String, Vec<usize>> =
        std::collections::HashMap::new();

    for (i, line) in text.split('\n').enumerate() {
        let ln = i + 1;
        let Some((kind, name)) = match_line_marker(line) else {
            continue;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        match kind.to_lowercase().as_str() {
            "region" => starts_by_name.entry(name).or_default().push(ln),
            "endregion" => {
                if let Some(stack) = starts_by_name.get_mut(&name) {
                    if let Some(start) = stack.pop() {
                        if start <= ln {
                            anchors.push(Anchor { name, start, end: ln });
                        }
                    }
                }
            }
            _ => {}
        }
    }
    anchors
}

fn parse_block_markers(text: &str) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let mut opens: Vec<(String, usize)> = Vec::new();

    for caps in RE_BLOCK.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let kind = caps.get(1).unwrap().as_str().to_lowercase();
        let name = caps.get(2).unwrap().as_str().trim().to_string();
        if name.is_empty() {
            continue;
        }
        match kind.as_str() {
            "region" => opens.push((name, whole.start())),
            "endregion" => {
                // Pair with the nearest preceding open of the same name.
                if let Some(pos) = opens.iter().rposition(|(n, _)| *n == name) {
                    let (_, off) = opens.remove(pos);
                    let start = line_of(text, off);
                    let end = line_of(text, whole.end());
                    if start <= end {
                        anchors.push(Anchor { name, start, end });
                    }
                }
            }
            _ => {}
        }
    }
    anchors
}

fn match_line_marker(line: &str) -> Option<(String, String)> {
    let caps = RE_LINE.captures(line).or_else(|| RE_HASH.captures(line))?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

fn normalize(a: &mut Anchor) {
    if a.start < 1 {
        a.start = 1;
    }
    if a.end < a.start {
        a.end = a.start;
    }
    a.name = a.name.trim().to_string();
}

/// Remove exact duplicates (same name/start/end), preserving order.
fn dedup(input: Vec<Anchor>) -> Vec<Anchor> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(input.len());
    for a in input {
        if seen.insert((a.name.clone(), a.start, a.end)) {
            out.push(a);
        }
    }
    out
}
