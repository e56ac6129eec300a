//! Java extractor: package, primary top-level type (class/interface/enum),
//! methods and constructors.
//!
//! Only the first declared top-level type becomes the primary type; nested
//! types are not modeled, and the method regex is heuristic.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_PKG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap());

static RE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:public\s+)?(class|interface|enum)\s+([A-Za-z0-9_]+)").unwrap()
});

// Optional modifiers, a permissive return-type token (generics/arrays
// allowed), then the method name. Constructors have no return type and are
// matched separately against the primary type name.
static RE_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:public|protected|private|static|final|synchronized|native|abstract|default|\s)+\s*[A-Za-z0-9_<>\[\].?]+\s+([A-Za-z0-9_]+)\s*\(",
    )
    .unwrap()
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

    for caps in RE_METHOD.captures_iter(text) {
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

    if !res.primary_type.is_empty() {
        let ctor_pattern = format!(
            r"(?m)^\s*(?:public|protected|private|\s)+\s*{}\s*\(",
            regex::escape(&res.primary_type)
        );
        if let Ok(re_ctor) = Regex::new(&ctor_pattern) {
            for m in re_ctor.find_iter(text) {
                let start = line_of(text, m.start());
                res.symbols.push(symbol_at(
                    join_qname(&res.package, &res.primary_type, &res.primary_type),
                    "ctor",
                    rel_path,
                    start,
                ));
                res.exports.push(format!("{}()", res.primary_type));
            }
        }
    }

    res
}
