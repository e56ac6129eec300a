//! Manifest assembly: per-file extraction fan-out, canonical ordering and
//! the bundle id.
//!
//! Per-file extraction (anchors + symbols + auto-anchors) is a pure
//! function of one file's bytes and runs on a rayon parallel iterator; the
//! order-preserving collect plus the canonical sorts below keep the output
//! byte-identical regardless of scheduling.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use super::{
    build_anchor_pointers, build_auto_anchors, build_slices, build_symbol_pointers, Artifacts,
    AutoAnchorConfig, ManFile, Manifest, Pointer, Slice, Symbol, Symbols,
};
use crate::error::Result;
use crate::extract;
use crate::graph::{self, GraphFile};
use crate::hashing::sha256_hex;
use crate::lang::Lang;
use crate::textutil::{count_lines, normalize_utf8_lf};
use crate::walk::FileEntry;

/// Options for artifact building, threaded explicitly.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Max lines per file before chunk slices kick in. 0 means one
    /// whole-file chunk for non-anchored files.
    pub max_file_lines: usize,
    /// When non-empty, only files of these language tags are indexed.
    pub lang_hints: BTreeSet<String>,
    pub auto_anchors: AutoAnchorConfig,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_file_lines: 500,
            lang_hints: BTreeSet::new(),
            auto_anchors: AutoAnchorConfig::default(),
        }
    }
}

/// Compute the canonical bundle hash: SHA-256 hex over the sorted
/// `"<normalized-path>:<lowercase-hash>\n"` lines of the manifest.
pub fn compute_bundle_id(man: &Manifest) -> String {
    if man.files.is_empty() {
        return sha256_hex(b"");
    }
    let mut lines: Vec<String> = man
        .files
        .iter()
        .map(|f| format!("{}:{}", normalize_path(&f.path), f.hash.to_lowercase()))
        .collect();
    lines.sort();
    let mut buf = String::new();
    for line in lines {
        buf.push_str(&line);
        buf.push('\n');
    }
    sha256_hex(buf.as_bytes())
}

/// Path normalization used by the bundle id: drop a leading "./", convert
/// backslashes to '/', collapse consecutive slashes.
pub(crate) fn normalize_path(p: &str) -> String {
    let p = p.strip_prefix("./").unwrap_or(p);
    let mut out = String::with_capacity(p.len());
    for c in p.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

struct FileArtifacts {
    manifest: ManFile,
    symbols: Vec<Symbol>,
    slices: Vec<Slice>,
    pointers: Vec<Pointer>,
}

/// Build manifest, symbols, slices, pointers and the import graph for the
/// collected files.
pub fn build_artifacts(root: &Path, files: &[FileEntry], opts: &IndexOptions) -> Result<Artifacts> {
    let per_file: Vec<Option<FileArtifacts>> = files
        .par_iter()
        .map(|f| {
            let data = fs::read(&f.abs_path).ok()?;
            process_file(f, &data, opts)
        })
        .collect();

    let mut man_files = Vec::new();
    let mut symbols = Vec::new();
    let mut slices = Vec::new();
    let mut pointers = Vec::new();
    for fa in per_file.into_iter().flatten() {
        man_files.push(fa.manifest);
        symbols.extend(fa.symbols);
        slices.extend(fa.slices);
        pointers.extend(fa.pointers);
    }

    let graph_files: Vec<GraphFile> = files
        .iter()
        .map(|f| GraphFile {
            rel_path: f.rel_path.clone(),
            abs_path: f.abs_path.clone(),
            ext: f.ext.clone(),
        })
        .collect();
    let graph = graph::build_from(root, &graph_files);

    man_files.sort_by(|a, b| a.path.cmp(&b.path));
    slices.sort_by(|a, b| (a.path.as_str(), a.start, a.end).cmp(&(b.path.as_str(), b.start, b.end)));

    if !symbols.is_empty() {
        pointers.extend(build_symbol_pointers(&symbols));
    }
    symbols
        .sort_by(|a, b| (a.path.as_str(), a.start, a.end).cmp(&(b.path.as_str(), b.start, b.end)));
    pointers.sort_by(|a, b| {
        (a.id.as_str(), a.path.as_str(), a.start, a.end)
            .cmp(&(b.id.as_str(), b.path.as_str(), b.start, b.end))
    });

    let module = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "bundle".into());
    let mut manifest = Manifest {
        module,
        files: man_files,
        ..Manifest::default()
    };
    manifest.bundle_id = compute_bundle_id(&manifest);

    Ok(Artifacts {
        manifest,
        symbols: Symbols {
            version: 1,
            symbols,
        },
        slices,
        pointers,
        graph,
    })
}

fn process_file(f: &FileEntry, data: &[u8], opts: &IndexOptions) -> Option<FileArtifacts> {
    let text = normalize_utf8_lf(data);
    let lang = Lang::from_ext(&f.ext);

    if !opts.lang_hints.is_empty() && !opts.lang_hints.contains(lang.tag()) {
        return None;
    }

    let mut anchors = super::extract_anchors(&text);
    let extracted = extract::extract(lang, &f.rel_path, &text);

    let total_lines = count_lines(text.as_bytes());
    let mut symbols = extracted.symbols;
    finalize_symbol_ends(&mut symbols, total_lines);

    let auto = build_auto_anchors(
        &opts.auto_anchors,
        &f.rel_path,
        &text,
        lang,
        &symbols,
        &anchors,
        total_lines,
    );
    anchors.extend(auto);

    let manifest = ManFile {
        path: f.rel_path.clone(),
        package: extracted.package,
        class: extracted.primary_type,
        kind: extracted.kind,
        summary: String::new(),
        exports: extracted.exports,
        depends_on: Vec::new(),
        tags: Vec::new(),
        hash: f.sha256_hex.clone(),
        lines: total_lines,
        anchors: anchors.clone(),
    };

    let slices = build_slices(&f.rel_path, &anchors, total_lines, opts.max_file_lines);
    let pointers = build_anchor_pointers(&f.rel_path, &anchors);

    Some(FileArtifacts {
        manifest,
        symbols,
        slices,
        pointers,
    })
}

/// Sort symbols by start line and finalize each end as the next symbol's
/// start minus one, or the file end for the last symbol.
fn finalize_symbol_ends(symbols: &mut [Symbol], total_lines: usize) {
    symbols.sort_by_key(|s| s.start);
    let len = symbols.len();
    for i in 0..len {
        if i + 1 < len {
            let next_start = symbols[i + 1].start;
            symbols[i].end = next_start.saturating_sub(1).max(symbols[i].start);
        } else {
            symbols[i].end = total_lines;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn man_with(files: Vec<(&str, &str)>) -> Manifest {
        Manifest {
            module: "m".into(),
            files: files
                .into_iter()
                .map(|(p, h)| ManFile {
                    path: p.into(),
                    hash: h.into(),
                    lines: 1,
                    ..ManFile::default()
                })
                .collect(),
            ..Manifest::default()
        }
    }

    #[test]
    fn test_bundle_id_normalizes_paths_and_hash_case() {
        let man = man_with(vec![("./a.go", "AA11"), ("b.go", "bb22")]);
        let expected = sha256_hex(b"a.go:aa11\nb.go:bb22\n");
        assert_eq!(compute_bundle_id(&man), expected);
    }

    #[test]
    fn test_bundle_id_is_order_independent() {
        let man1 = man_with(vec![("a.go", "aa"), ("b.go", "bb")]);
        let man2 = man_with(vec![("b.go", "bb"), ("a.go", "aa")]);
        assert_eq!(compute_bundle_id(&man1), compute_bundle_id(&man2));
    }

    #[test]
    fn test_bundle_id_empty_manifest() {
        let man = Manifest::default();
        assert_eq!(compute_bundle_id(&man), sha256_hex(b""));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./a/b.go"), "a/b.go");
        assert_eq!(normalize_path("a\\b\\c.go"), "a/b/c.go");
        assert_eq!(normalize_path("a//b.go"), "a/b.go");
        assert_eq!(normalize_path("a.go"), "a.go");
    }

    #[test]
    fn test_finalize_symbol_ends() {
        let mut syms = vec![
            Symbol {
                qname: "b".into(),
                kind: "func".into(),
                path: "f.go".into(),
                start: 10,
                end: 10,
            },
            Symbol {
                qname: "a".into(),
                kind: "func".into(),
                path: "f.go".into(),
                start: 3,
                end: 3,
            },
        ];
        finalize_symbol_ends(&mut syms, 20);
        assert_eq!((syms[0].start, syms[0].end), (3, 9));
        assert_eq!((syms[1].start, syms[1].end), (10, 20));
    }

    #[test]
    fn test_build_artifacts_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("srv.go"),
            "package srv\n\nfunc Start() {}\n\nfunc Stop() {}\n",
        )
        .unwrap();
        let files = vec![FileEntry {
            rel_path: "srv.go".into(),
            abs_path: dir.path().join("srv.go"),
            size: 0,
            sha256_hex: "ab".repeat(32),
            ext: ".go".into(),
        }];

        let art = build_artifacts(dir.path(), &files, &IndexOptions::default()).unwrap();
        assert_eq!(art.manifest.files.len(), 1);
        assert_eq!(art.manifest.files[0].package, "srv");
        assert_eq!(art.symbols.symbols.len(), 2);
        assert!(!art.manifest.bundle_id.is_empty());
        // Symbol pointers exist for both functions.
        let ids: Vec<_> = art.pointers.iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&"srv-Start"));
        assert!(ids.contains(&"srv-Stop"));
        // Deterministic: sorted by (id, path, start, end).
        let mut sorted = art.pointers.clone();
        sorted.sort_by(|a, b| {
            (a.id.as_str(), a.path.as_str(), a.start, a.end)
                .cmp(&(b.id.as_str(), b.path.as_str(), b.start, b.end))
        });
        assert_eq!(art.pointers, sorted);
    }

    #[test]
    fn test_lang_hints_filter_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package a\n").unwrap();
        std::fs::write(dir.path().join("b.java"), "package b;\n").unwrap();
        let entry = |name: &str, ext: &str| FileEntry {
            rel_path: name.into(),
            abs_path: dir.path().join(name),
            size: 0,
            sha256_hex: "cd".repeat(32),
            ext: ext.into(),
        };
        let files = vec![entry("a.go", ".go"), entry("b.java", ".java")];

        let mut opts = IndexOptions::default();
        opts.lang_hints.insert("go".into());
        let art = build_artifacts(dir.path(), &files, &opts).unwrap();
        assert_eq!(art.manifest.files.len(), 1);
        assert_eq!(art.manifest.files[0].path, "a.go");
    }
}
