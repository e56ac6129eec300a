//! Per-language shallow symbol extraction.
//!
//! Extraction is regex-based by design: the goal is navigation-quality
//! output, not a correct parse tree. Every extractor returns the same
//! [`ExtractResult`] shape, and a failing regex only means fewer symbols
//! for that file.

mod cpp;
mod csharp;
mod go;
mod java;
mod kotlin;
mod python;
mod ts;

use crate::index::Symbol;
use crate::lang::Lang;

/// Output of a per-language extractor.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    /// Package or namespace, if the language has one.
    pub package: String,
    /// "class" | "interface" | "enum" | "struct" | "object" | "file".
    pub kind: String,
    /// Primary top-level type name, empty when kind == "file".
    pub primary_type: String,
    /// Quick API surface, e.g. `["start()"]`.
    pub exports: Vec<String>,
    /// Symbols with 1-based start lines; ends are finalized by the caller.
    pub symbols: Vec<Symbol>,
}

impl ExtractResult {
    fn plain_file() -> Self {
        Self {
            kind: "file".into(),
            ..Self::default()
        }
    }
}

/// Run the extractor for `lang` over a normalized file body.
pub fn extract(lang: Lang, rel_path: &str, text: &str) -> ExtractResult {
    match lang {
        Lang::Java => java::extract(rel_path, text),
        Lang::Go => go::extract(rel_path, text),
        Lang::Ts => ts::extract(rel_path, text),
        Lang::Kotlin => kotlin::extract(rel_path, text),
        Lang::CSharp => csharp::extract(rel_path, text),
        Lang::Python => python::extract(rel_path, text),
        Lang::Cpp => cpp::extract(rel_path, text),
        Lang::Unknown => ExtractResult::plain_file(),
    }
}

/// Concatenate package, type and member into a qualified symbol name.
/// Empty segments are skipped; dots are inserted only between non-empty
/// parts.
///
/// ```
/// use sourcepack::extract::join_qname;
/// assert_eq!(join_qname("org.acme", "Server", "start"), "org.acme.Server.start");
/// assert_eq!(join_qname("org.acme", "", "main"), "org.acme.main");
/// assert_eq!(join_qname("", "Server", "start"), "Server.start");
/// assert_eq!(join_qname("", "", "main"), "main");
/// ```
pub fn join_qname(pkg: &str, typ: &str, member: &str) -> String {
    let mut out = String::new();
    for part in [pkg.trim(), typ.trim(), member.trim()] {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(part);
    }
    out
}

pub(crate) fn symbol_at(qname: String, kind: &str, path: &str, start: usize) -> Symbol {
    Symbol {
        qname,
        kind: kind.into(),
        path: path.into(),
        start,
        end: start,
    }
}
