//! Python extractor. The package is inferred from the relative directory
//! joined by dots plus the module name; `__init__.py` marks the package
//! itself.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*class\s+([A-Za-z_]\w*)\s*\(").unwrap());
static RE_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*def\s+([A-Za-z_]\w*)\s*\(").unwrap());

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();
    res.package = module_package(rel_path);

    if let Some(caps) = RE_CLASS.captures(text) {
        res.kind = "class".into();
        res.primary_type = caps[1].to_string();
    } else {
        res.kind = "file".into();
    }

    for caps in RE_DEF.captures_iter(text) {
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

/// Dotted package for a relative path: directories joined by '.', plus the
/// module name unless the file is `__init__.py`.
fn module_package(rel_path: &str) -> String {
    let clean = rel_path.replace('\\', "/");
    let (dir, base) = match clean.rfind('/') {
        Some(i) => (&clean[..i], &clean[i + 1..]),
        None => ("", clean.as_str()),
    };
    let mut pkg = if dir.is_empty() {
        String::new()
    } else {
        dir.replace('/', ".")
    };
    if base != "__init__.py" {
        if let Some(module) = base.strip_suffix(".py") {
            if pkg.is_empty() {
                pkg = module.to_string();
            } else {
                pkg = format!("{pkg}.{module}");
            }
        }
    }
    pkg
}
