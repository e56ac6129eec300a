//! C/C++ extractor: namespace (dot-joined), primary class/struct/enum,
//! qualified method definitions, in-class declarations and free functions.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_NS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][\w:]*)\s*\{").unwrap());
static RE_PRIMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(class|struct|enum)\s+([A-Za-z_]\w*)\b").unwrap());
// Type::method(
static RE_QUAL_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:[A-Za-z_][\w:<>*&\s]+)?\b([A-Za-z_]\w*)::([A-Za-z_]\w*)\s*\(").unwrap()
});
static RE_DECL_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:virtual\s+)?[A-Za-z_][\w:<>*&\s]+\s+([A-Za-z_]\w*)\s*\(").unwrap()
});
static RE_FREE_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:inline\s+)?[A-Za-z_][\w:<>*&\s]+\s+([A-Za-z_]\w*)\s*\(").unwrap()
});

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();

    if let Some(caps) = RE_NS.captures(text) {
        let name = caps[1].replace("::", ".");
        res.package = name.trim_matches([':', '.']).to_string();
    }

    if let Some(caps) = RE_PRIMARY.captures(text) {
        res.kind = caps[1].to_lowercase();
        res.primary_type = caps[2].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        let fq = join_qname(&res.package, &res.primary_type, "");
        if !fq.is_empty() {
            let kind = res.kind.clone();
            res.symbols.push(symbol_at(fq, &kind, rel_path, start));
        }
    } else {
        res.kind = "file".into();
    }

    for caps in RE_QUAL_METHOD.captures_iter(text) {
        let recv = caps[1].to_string();
        let name = caps[2].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        let fq = join_qname(&res.package, &recv, &name);
        if fq.is_empty() {
            continue;
        }
        res.symbols.push(symbol_at(fq, "method", rel_path, start));
        res.exports.push(format!("{name}()"));
    }

    if !res.primary_type.is_empty() {
        for caps in RE_DECL_METHOD.captures_iter(text) {
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
    }

    for caps in RE_FREE_FN.captures_iter(text) {
        // Skip qualified definitions already handled above.
        let whole = caps.get(0).unwrap();
        let line_start = text[..whole.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        if text[line_start..whole.end()].contains("::") {
            continue;
        }
        let name = caps[1].to_string();
        let start = line_of(text, whole.start());
        res.symbols.push(symbol_at(
            join_qname(&res.package, "", &name),
            "func",
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }

    // Deduplicate exports, keeping first occurrences.
    if res.exports.len() > 1 {
        let mut seen = std::collections::HashSet::new();
        res.exports.retain(|e| seen.insert(e.clone()));
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_dot_joined() {
        let src = "namespace acme::net {\nclass Socket;\n}\n";
        let res = extract("socket.hpp", src);
        assert_eq!(res.package, "acme.net");
    }

    #[test]
    fn test_qualified_method_definitions() {
        let src = "namespace acme {\nclass Server {\n};\n}\nvoid Server::start() {\n}\n";
        let res = extract("server.cpp", src);
        assert_eq!(res.kind, "class");
        assert_eq!(res.primary_type, "Server");
        let names: Vec<_> = res.symbols.iter().map(|s| s.qname.as_str()).collect();
        assert!(names.contains(&"acme.Server"));
        assert!(names.contains(&"acme.Server.start"));
    }

    #[test]
    fn test_free_function_without_qualifier() {
        let src = "int add(int a, int b) {\n  return a + b;\n}\n";
        let res = extract("math.cpp", src);
        assert_eq!(res.kind, "file");
        assert_eq!(res.symbols[0].qname, "add");
        assert_eq!(res.symbols[0].kind, "func");
        assert_eq!(res.exports, vec!["add()"]);
    }
}
