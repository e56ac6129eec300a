//! Virtual anchor synthesis.
//!
//! When a file carries no explicit region markers (or too few), anchors are
//! derived from four heuristic families: per-symbol anchors, a single
//! imports anchor, test anchors, and coarse language regions (CONSTS /
//! TYPES / FUNCS / METHODS / CTORS / FIELDS). All generated names carry the
//! configured prefix so consumers can tell them apart from authored
//! anchors.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Anchor, Symbol};
use crate::lang::Lang;
use crate::textutil::line_of;

/// Controls virtual anchor generation. Threaded through the pipeline
/// explicitly; there is no global configuration.
#[derive(Debug, Clone)]
pub struct AutoAnchorConfig {
    pub enabled: bool,
    /// Minimum region length in lines; shorter candidates are dropped.
    pub min_lines: usize,
    /// Maximum anchors per file after ranking. 0 = unlimited.
    pub max_per_file: usize,
    pub include_imports: bool,
    pub include_tests: bool,
    /// Name prefix for all generated anchors.
    pub prefix: String,
}

impl Default for AutoAnchorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_lines: 8,
            max_per_file: 64,
            include_imports: true,
            include_tests: true,
            prefix: "auto:".into(),
        }
    }
}

/// Derive virtual anchors from symbols and heuristics. `existing` anchors
/// suppress exact duplicates in the output.
pub fn build_auto_anchors(
    cfg: &AutoAnchorConfig,
    rel_path: &str,
    text: &str,
    lang: Lang,
    symbols: &[Symbol],
    existing: &[Anchor],
    total_lines: usize,
) -> Vec<Anchor> {
    if !cfg.enabled || total_lines < 1 {
        return Vec::new();
    }
    let min_lines = cfg.min_lines.max(1);

    let mut candidates: Vec<(Anchor, usize)> = Vec::new();
    let mut order = 0usize;
    let mut push = |cands: &mut Vec<(Anchor, usize)>, a: Anchor| {
        cands.push((a, order));
        order += 1;
    };

    for sym in symbols {
        if let Some(a) = symbol_candidate(sym, &cfg.prefix, min_lines) {
            push(&mut candidates, a);
        }
    }

    if cfg.include_imports {
        if let Some(mut imp) = import_anchor(text, lang) {
            if line_span(&imp) >= min_lines {
                imp.name = format!("{}{}", cfg.prefix, imp.name);
                push(&mut candidates, imp);
            }
        }
    }

    if cfg.include_tests {
        for mut t in test_anchors(rel_path, text, lang) {
            if line_span(&t) < min_lines {
                continue;
            }
            t.name = format!("{}{}", cfg.prefix, t.name);
            push(&mut candidates, t);
        }
    }

    for coarse in coarse_anchors(text, lang, &cfg.prefix) {
        if line_span(&coarse) < min_lines {
            continue;
        }
        push(&mut candidates, coarse);
    }

    let ranked = rank_and_cap(candidates, cfg.max_per_file);
    normalize(ranked, existing, total_lines)
}

fn symbol_candidate(sym: &Symbol, prefix: &str, min_lines: usize) -> Option<Anchor> {
    let start = sym.start.max(1);
    let end = sym.end.max(start);
    if end - start + 1 < min_lines {
        return None;
    }
    Some(Anchor {
        name: format!("{}SYM:{}", prefix, symbol_anchor_name(&sym.qname)),
        start,
        end,
    })
}

/// Last two dot segments of a qualified name, or the whole name.
fn symbol_anchor_name(qname: &str) -> String {
    let parts: Vec<&str> = qname.split('.').collect();
    if parts.len() >= 2 {
        format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        qname.to_string()
    }
}

fn line_span(a: &Anchor) -> usize {
    a.end - a.start + 1
}

static RE_GO_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?ms)^\s*import\s+(?:\([^)]*\)|"[^"]+")"#).unwrap());
static RE_TS_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+[^;]+;?\s*$").unwrap());

fn import_anchor(text: &str, lang: Lang) -> Option<Anchor> {
    match lang {
        Lang::Java => {
            // Consecutive `import ` lines within the first 400 lines, ended
            // by the first non-blank non-comment line.
            let mut first = 0usize;
            let mut last = 0usize;
            let mut found = false;
            for (i, line) in text.split('\n').take(400).enumerate() {
                let ln = line.trim();
                if ln.starts_with("import ") {
                    if !found {
                        first = i + 1;
                        found = true;
                    }
                    last = i + 1;
                    continue;
                }
                if found && !ln.is_empty() && !ln.starts_with("//") {
                    break;
                }
            }
            if found && last >= first {
                return Some(Anchor {
                    name: "IMPORTS".into(),
                    start: first,
                    end: last,
                });
            }
            None
        }
        Lang::Go => {
            let m = RE_GO_IMPORT.find(text)?;
            Some(Anchor {
                name: "IMPORTS".into(),
                start: line_of(text, m.start()),
                end: line_of(text, m.end()),
            })
        }
        Lang::Ts => {
            let matches: Vec<_> = RE_TS_IMPORT.find_iter(text).collect();
            let first = matches.first()?;
            if first.start() >= 600 {
                return None;
            }
            let last = matches.last()?;
            Some(Anchor {
                name: "IMPORTS".into(),
                start: line_of(text, first.start()),
                end: line_of(text, last.end()),
            })
        }
        _ => None,
    }
}

static RE_GO_TEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*func\s+(Test|Benchmark|Example)[A-Za-z0-9_]*\s*\(").unwrap()
});
static RE_TS_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(describe|it|test)\s*\(").unwrap());

fn test_anchors(rel_path: &str, text: &str, lang: Lang) -> Vec<Anchor> {
    let re = match lang {
        Lang::Go => {
            if !rel_path.ends_with("_test.go") {
                return Vec::new();
            }
            &RE_GO_TEST
        }
        Lang::Ts => &RE_TS_TEST,
        _ => return Vec::new(),
    };
    re.find_iter(text)
        .map(|m| {
            let start = line_of(text, m.start());
            Anchor {
                name: "TEST".into(),
                start,
                end: start,
            }
        })
        .collect()
}

fn coarse_anchors(text: &str, lang: Lang, prefix: &str) -> Vec<Anchor> {
    let mut out = Vec::new();
    let mut add = |a: Option<Anchor>| {
        if let Some(mut a) = a {
            a.name = format!("{prefix}{}", a.name);
            out.push(a);
        }
    };
    match lang {
        Lang::Go => {
            add(coarse_region(text, r"(?ms)^\s*const\s*\([^)]*\)", "CONSTS"));
            add(coarse_range(text, r"(?m)^\s*const\s+\w", "CONSTS"));
            add(coarse_range(text, r"(?m)^\s*type\s+[A-Za-z_]\w*\b", "TYPES"));
            add(coarse_range(
                text,
                r"(?m)^\s*func\s+(?:\([^)]*\)\s*)?[A-Za-z_]\w*\s*\(",
                "FUNCS",
            ));
        }
        Lang::Ts => {
            add(coarse_range(
                text,
                r"(?m)^\s*export\s+(?:const|let|var)\s+",
                "CONSTS",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*export\s+(?:interface|type|class)\b",
                "TYPES",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*export\s+(?:async\s+)?function\b|^\s*export\s+const\s+[A-Za-z_$][\w$]*\s*=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
                "FUNCS",
            ));
        }
        Lang::Java => {
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|protected|private|static|final|synchronized|native|abstract|default|strictfp|)\s*[\w<>\[\]]+\s+[A-Za-z_]\w*\s*\(",
                "METHODS",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|protected|private)\s+[A-Z][A-Za-z0-9_]*\s*\(",
                "CTORS",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|protected|private|static|final)\s+[\w<>\[\],\s]+;\s*$",
                "FIELDS",
            ));
        }
        Lang::CSharp => {
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|internal|protected|private|static|virtual|override|sealed|async|extern|unsafe|new)\s+.*\(",
                "METHODS",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|internal|protected|private)\s+[A-Z][A-Za-z0-9_]*\s*\(",
                "CTORS",
            ));
            add(coarse_range(
                text,
                r"(?m)^\s*(?:public|internal|protected|private|static|readonly|const|volatile)\s+[^;]+;\s*$",
                "FIELDS",
            ));
        }
        _ => {}
    }
    out
}

/// Span from the first to the last match of `pattern`.
fn coarse_range(text: &str, pattern: &str, name: &str) -> Option<Anchor> {
    let re = Regex::new(pattern).ok()?;
    let matches: Vec<_> = re.find_iter(text).collect();
    let first = matches.first()?;
    let last = matches.last()?;
    Some(Anchor {
        name: name.into(),
        start: line_of(text, first.start()),
        end: line_of(text, last.end()),
    })
}

/// Span of the first match of `pattern` only.
fn coarse_region(text: &str, pattern: &str, name: &str) -> Option<Anchor> {
    let re = Regex::new(pattern).ok()?;
    let m = re.find(text)?;
    Some(Anchor {
        name: name.into(),
        start: line_of(text, m.start()),
        end: line_of(text, m.end()),
    })
}

fn rank_and_cap(mut candidates: Vec<(Anchor, usize)>, max_per_file: usize) -> Vec<Anchor> {
    candidates.sort_by(|(a, ai), (b, bi)| {
        (a.start, a.end, a.name.as_str(), *ai).cmp(&(b.start, b.end, b.name.as_str(), *bi))
    });
    let mut anchors: Vec<Anchor> = candidates.into_iter().map(|(a, _)| a).collect();
    if max_per_file > 0 && anchors.len() > max_per_file {
        anchors.truncate(max_per_file);
    }
    anchors
}

/// Clamp to `[1, total]`, sort, drop exact duplicates and anchors already
/// present in the explicit set.
fn normalize(mut anchors: Vec<Anchor>, explicit: &[Anchor], total: usize) -> Vec<Anchor> {
    if anchors.is_empty() {
        return anchors;
    }
    for a in &mut anchors {
        if a.start < 1 {
            a.start = 1;
        }
        if a.end < a.start {
            a.end = a.start;
        }
        if a.end > total {
            a.end = total;
        }
    }
    anchors.sort_by(|a, b| {
        (a.start, a.end, a.name.as_str()).cmp(&(b.start, b.end, b.name.as_str()))
    });
    anchors.dedup_by(|a, b| a.name == b.name && a.start == b.start && a.end == b.end);

    if explicit.is_empty() {
        return anchors;
    }
    let known: std::collections::HashSet<_> = explicit
        .iter()
        .map(|a| (a.name.as_str(), a.start, a.end))
        .collect();
    anchors.retain(|a| !known.contains(&(a.name.as_str(), a.start, a.end)));
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(min_lines: usize) -> AutoAnchorConfig {
        AutoAnchorConfig {
            min_lines,
            ..AutoAnchorConfig::default()
        }
    }

    fn sym(qname: &str, start: usize, end: usize) -> Symbol {
        Symbol {
            qname: qname.into(),
            kind: "func".into(),
            path: "x.go".into(),
            start,
            end,
        }
    }

    #[test]
    fn test_symbol_anchors_respect_min_lines() {
        let syms = vec![sym("pkg.Long", 1, 20), sym("pkg.Short", 25, 26)];
        let got = build_auto_anchors(&cfg(8), "x.go", "", Lang::Go, &syms, &[], 30);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name, "auto:SYM:pkg.Long");
        assert_eq!((got[0].start, got[0].end), (1, 20));
    }

    #[test]
    fn test_symbol_anchor_name_keeps_last_two_segments() {
        assert_eq!(symbol_anchor_name("org.acme.Server.start"), "Server.start");
        assert_eq!(symbol_anchor_name("main"), "main");
    }

    #[test]
    fn test_go_import_block_anchor() {
        let text = "package x\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n\nfunc F() {}\n";
        let got = import_anchor(text, Lang::Go).unwrap();
        assert_eq!((got.start, got.end), (2, 5));
    }

    #[test]
    fn test_ts_import_run_anchor() {
        let text = "import a from 'a';\nimport b from 'b';\n\nexport function f() {}\n";
        let got = import_anchor(text, Lang::Ts).unwrap();
        assert_eq!((got.start, got.end), (1, 2));
    }

    #[test]
    fn test_java_import_run_ends_at_code() {
        let text = "package p;\nimport a.B;\nimport a.C;\n// note\nclass X {}\n";
        let got = import_anchor(text, Lang::Java).unwrap();
        assert_eq!((got.start, got.end), (2, 3));
    }

    #[test]
    fn test_go_test_anchors_only_in_test_files() {
        let text = "package x\n\nfunc TestOne(t *testing.T) {}\n";
        assert!(test_anchors("x.go", text, Lang::Go).is_empty());
        let got = test_anchors("x_test.go", text, Lang::Go);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].start, 3);
    }

    #[test]
    fn test_disabled_config_yields_nothing() {
        let mut c = cfg(1);
        c.enabled = false;
        let syms = vec![sym("pkg.F", 1, 10)];
        assert!(build_auto_anchors(&c, "x.go", "", Lang::Go, &syms, &[], 10).is_empty());
    }

    #[test]
    fn test_max_per_file_caps_output() {
        let syms: Vec<Symbol> = (0..10)
            .map(|i| sym(&format!("pkg.F{i}"), i * 10 + 1, i * 10 + 9))
            .collect();
        let mut c = cfg(1);
        c.max_per_file = 3;
        let got = build_auto_anchors(&c, "x.go", "", Lang::Go, &syms, &[], 100);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn test_existing_duplicates_are_dropped() {
        let syms = vec![sym("pkg.F", 1, 10)];
        let existing = vec![Anchor {
            name: "auto:SYM:pkg.F".into(),
            start: 1,
            end: 10,
        }];
        let got = build_auto_anchors(&cfg(1), "x.go", "", Lang::Go, &syms, &existing, 10);
        assert!(got.is_empty());
    }

    #[test]
    fn test_clamped_to_file_length() {
        let syms = vec![sym("pkg.F", 1, 50)];
        let got = build_auto_anchors(&cfg(1), "x.go", "", Lang::Go, &syms, &[], 20);
        assert_eq!((got[0].start, got[0].end), (1, 20));
    }
}
