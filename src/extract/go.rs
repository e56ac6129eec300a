//! Go extractor: package name plus top-level functions and methods.
//!
//! Receiver parsing strips pointers, package qualifiers and generic
//! brackets to recover a clean base type. Function literals are not
//! descended into.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_PKG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z0-9_]+)\s*$").unwrap());

// func <Name>( ... ) or func (<recv>) <Name>(
static RE_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*func\s+(\([^)]+\)\s*)?([A-Za-z0-9_]+)\s*\(").unwrap());

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();
    // Go files do not have a single primary class/type.
    res.kind = "file".into();

    if let Some(caps) = RE_PKG.captures(text) {
        res.package = caps[1].to_string();
    }

    for caps in RE_FUNC.captures_iter(text) {
        let start = line_of(text, caps.get(0).unwrap().start());
        let name = caps[2].to_string();
        let recv_type = caps
            .get(1)
            .map(|m| receiver_base_type(m.as_str()))
            .unwrap_or_default();
        let kind = if recv_type.is_empty() { "func" } else { "method" };
        res.symbols.push(symbol_at(
            join_qname(&res.package, &recv_type, &name),
            kind,
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }
    res
}

/// Extract a clean base type from a receiver block:
/// `"(s *Server)"` -> `"Server"`, `"(p *pkg.Type[T])"` -> `"Type"`.
fn receiver_base_type(recv_block: &str) -> String {
    let mut s = recv_block.trim();
    if let Some(stripped) = s.strip_prefix('(') {
        if let Some(i) = stripped.find(')') {
            s = &stripped[..i];
        } else {
            s = stripped;
        }
    }
    let Some(last) = s.split_whitespace().last() else {
        return String::new();
    };
    let mut typ = last.trim_start_matches(['*', '&']);
    if let Some(i) = typ.find('[') {
        typ = &typ[..i];
    }
    if let Some(i) = typ.rfind('.') {
        typ = &typ[i + 1..];
    }
    typ.trim().to_string()
}
