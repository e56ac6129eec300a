//! C# extractor: namespace, first class/struct/interface/enum, methods
//! introduced by a visibility or modifier keyword.
//!
//! `#region` anchors are handled by the anchor extractor, not here.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_NS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][\w.]*)").unwrap());
static RE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:[A-Za-z]+\s+)*(class|struct|interface|enum)\s+([A-Za-z_]\w*)").unwrap()
});
static RE_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:public|internal|protected|private|static|virtual|override|sealed|async|extern|unsafe|new)\s+.*?([A-Za-z_]\w*)\s*\(",
    )
    .unwrap()
});

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();

    if let Some(caps) = RE_NS.captures(text) {
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
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_type_and_methods() {
        let src = "namespace Acme.Web\n\npublic class Controller\n{\n    public void Index() {}\n    private static int Count() { return 0; }\n}\n";
        let res = extract("Controller.cs", src);
        assert_eq!(res.package, "Acme.Web");
        assert_eq!(res.kind, "class");
        assert_eq!(res.primary_type, "Controller");
        let names: Vec<_> = res.symbols.iter().map(|s| s.qname.as_str()).collect();
        assert!(names.contains(&"Acme.Web.Controller.Index"));
        assert!(names.contains(&"Acme.Web.Controller.Count"));
    }

    #[test]
    fn test_struct_kind() {
        let res = extract("P.cs", "struct Point { }\n");
        assert_eq!(res.kind, "struct");
        assert_eq!(res.primary_type, "Point");
    }
}
