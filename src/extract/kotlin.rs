//! Kotlin extractor: package, first class/interface/object, functions
//! including extension functions.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_PKG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z_][\w.]*)").unwrap());
static RE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:public\s+|internal\s+|private\s+)?(class|interface|object)\s+([A-Za-z_]\w*)")
        .unwrap()
});
// fun name(   |   fun Receiver.name(
static RE_FUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:suspend\s+)?fun\s+(?:[A-Za-z_]\w*\.)?([A-Za-z_]\w*)\s*\(").unwrap()
});

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();

    if let Some(caps) = RE_PKG.captures(text) {
        res.package = caps[1].to_string();
    }
    if let Some(caps) = RE_TYPE.captures(text) {
        res.kind = caps[1].to_string();
        res.primary_type = caps[2].to_string();
    } else {
        res.kind = "file".into();
    }

    for caps in RE_FUN.captures_iter(text) {
        let name = caps[1].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        res.symbols.push(symbol_at(
            join_qname(&res.package, &res.primary_type, &name),
            "method",
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }
    res
}
