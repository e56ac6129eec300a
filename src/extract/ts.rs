//! TS/JS extractor, shared across `.ts`, `.tsx`, `.js`, `.jsx`, `.mjs`,
//! `.cjs`.
//!
//! Exported free functions are qualified against the primary type when one
//! exists (historical behavior kept for id stability); class bodies are not
//! descended into.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{join_qname, symbol_at, ExtractResult};
use crate::textutil::line_of;

static RE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:default\s+)?class(?:\s+([A-Za-z_$][\w$]*))?").unwrap()
});
static RE_INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s+interface\s+([A-Za-z_$][\w$]*)").unwrap());
static RE_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:async\s+)?function\*?\s+([A-Za-z_$][\w$]*)\s*\(").unwrap()
});
static RE_DEFAULT_NAMED_FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+default\s+function\s+([A-Za-z_$][\w$]*)\s*\(").unwrap()
});
static RE_DEFAULT_ANON_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s+default\s+function\s*\(").unwrap());
static RE_REEXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*export\s*\{([^}]*)\}\s*from\s*['"][^'"]+['"]"#).unwrap()
});
static RE_LET_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s+(?:let|var)\s+([A-Za-z_$][\w$]*)\s*=").unwrap());
static RE_CONST_ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+const\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
    )
    .unwrap()
});
static RE_CONST_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+const\s+([A-Za-z_$][\w$]*)\s*=\s*\{").unwrap()
});
static RE_OBJ_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[\t ]*([A-Za-z_$][\w$]*)\s*\(").unwrap());

pub(super) fn extract(rel_path: &str, text: &str) -> ExtractResult {
    let mut res = ExtractResult::default();

    // Primary type: prefer class, then interface. An anonymous default
    // class is recorded as "default".
    if let Some(caps) = RE_CLASS.captures(text) {
        res.kind = "class".into();
        res.primary_type = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "default".into());
    } else if let Some(caps) = RE_INTERFACE.captures(text) {
        res.kind = "interface".into();
        res.primary_type = caps[1].to_string();
    } else {
        res.kind = "file".into();
    }

    for caps in RE_FUNC.captures_iter(text) {
        let name = caps[1].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        res.symbols.push(symbol_at(
            join_qname("", &res.primary_type, &name),
            "method",
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }

    for caps in RE_DEFAULT_NAMED_FUNC.captures_iter(text) {
        let name = caps[1].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        res.symbols.push(symbol_at(
            join_qname("", "default", &name),
            "method",
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }

    for m in RE_DEFAULT_ANON_FUNC.find_iter(text) {
        let start = line_of(text, m.start());
        res.symbols
            .push(symbol_at("default".into(), "method", rel_path, start));
        res.exports.push("default()".into());
    }

    for caps in RE_REEXPORT_LIST.captures_iter(text) {
        for part in caps[1].split(',') {
            let name = part.split(" as ").next().unwrap_or("").trim();
            if !name.is_empty() {
                res.exports.push(format!("{name}()"));
            }
        }
    }

    for caps in RE_LET_VAR.captures_iter(text) {
        res.exports.push(caps[1].to_string());
    }

    for caps in RE_CONST_ARROW.captures_iter(text) {
        let name = caps[1].to_string();
        let start = line_of(text, caps.get(0).unwrap().start());
        res.symbols.push(symbol_at(
            join_qname("", &res.primary_type, &name),
            "method",
            rel_path,
            start,
        ));
        res.exports.push(format!("{name}()"));
    }

    // export const X = { foo() { ... } } — scan the object block up to the
    // first closing brace for method-like members.
    for caps in RE_CONST_OBJECT.captures_iter(text) {
        let obj = caps[1].to_string();
        let block_start = caps.get(0).unwrap().end();
        let Some(block_len) = text[block_start..].find('}') else {
            continue;
        };
        let block = &text[block_start..block_start + block_len];
        for m in RE_OBJ_METHOD.captures_iter(block) {
            let name = m[1].to_string();
            let start = line_of(text, block_start + m.get(0).unwrap().start());
            res.symbols.push(symbol_at(
                join_qname("", &obj, &name),
                "method",
                rel_path,
                start,
            ));
        }
    }

    res
}
