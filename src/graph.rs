//! Coarse import graph for heterogeneous codebases.
//!
//! Regex-driven scanners for Java, Go and TS/JS produce a directed graph
//! good enough for bundle navigation. Nodes are language-prefixed labels to
//! avoid collisions: `java:<package>`, `go:<package>`,
//! `js:<relpath-without-ext>`, `npm:<bare-spec>`. Relative TS/JS imports
//! resolve to normalized project-relative paths; bare specifiers go through
//! a minimal tsconfig resolver before falling back to `npm:`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A simple directed graph, nodes and edges sorted and deduplicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// Minimal file descriptor for graph building.
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    /// Lowercase extension including the dot.
    pub ext: String,
}

/// Scan the given files and return the import graph. Unreadable files are
/// skipped. The tsconfig resolver is loaded once from `root`.
pub fn build_from(root: &Path, files: &[GraphFile]) -> Graph {
    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();

    let resolver = TsResolver::load(root);

    for f in files {
        let Ok(data) = fs::read(&f.abs_path) else {
            continue;
        };
        let text = crate::textutil::normalize_utf8_lf(&data);

        match f.ext.as_str() {
            ".java" => {
                let (pkg, imports) = scan_java(&text);
                let pkg = if pkg.is_empty() {
                    dir_as_java_package(&f.rel_path)
                } else {
                    pkg
                };
                let from = format!("java:{pkg}");
                add_node(&mut nodes, &from);
                for imp in imports {
                    let to = format!("java:{imp}");
                    add_node(&mut nodes, &to);
                    add_edge(&mut edges, &from, &to);
                }
            }
            ".go" => {
                let (pkg, imports) = scan_go(&text);
                let pkg = if pkg.is_empty() {
                    dir_as_go_package(&f.rel_path)
                } else {
                    pkg
                };
                let from = format!("go:{pkg}");
                add_node(&mut nodes, &from);
                for imp in imports {
                    let to = format!("go:{imp}");
                    add_node(&mut nodes, &to);
                    add_edge(&mut edges, &from, &to);
                }
            }
            ".ts" | ".tsx" | ".js" => {
                let (from, imports) = scan_ts_js(&f.rel_path, &text, resolver.as_ref());
                add_node(&mut nodes, &from);
                for imp in imports {
                    add_node(&mut nodes, &imp);
                    add_edge(&mut edges, &from, &imp);
                }
            }
            _ => {}
        }
    }

    Graph {
        nodes: nodes.into_iter().collect(),
        edges: edges.into_iter().collect(),
    }
}

fn add_node(nodes: &mut BTreeSet<String>, n: &str) {
    if !n.is_empty() {
        nodes.insert(n.to_string());
    }
}

fn add_edge(edges: &mut BTreeSet<(String, String)>, from: &str, to: &str) {
    if from.is_empty() || to.is_empty() || from == to {
        return;
    }
    edges.insert((from.to_string(), to.to_string()));
}

// --- Java scanning ---------------------------------------------------------

static RE_JAVA_PKG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap());
static RE_JAVA_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([A-Za-z0-9_.*]+)\s*;").unwrap());

fn scan_java(text: &str) -> (String, Vec<String>) {
    let pkg = RE_JAVA_PKG
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let set: BTreeSet<String> = RE_JAVA_IMPORT
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (pkg, set.into_iter().collect())
}

fn dir_as_java_package(rel: &str) -> String {
    let dir = parent_dir(rel);
    if dir.is_empty() {
        "default".into()
    } else {
        dir.replace('/', ".")
    }
}

// --- Go scanning -----------------------------------------------------------

static RE_GO_PKG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z0-9_]+)\s*$").unwrap());
static RE_GO_IMPORT_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[A-Za-z_]\w*\s+)?"([^"]+)""#).unwrap());
static RE_GO_IMPORT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)import\s*\(\s*(.*?)\s*\)").unwrap());
static RE_GO_IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*(?:[A-Za-z_]\w*\s+)?"([^"]+)""#).unwrap());

fn scan_go(text: &str) -> (String, Vec<String>) {
    let pkg = RE_GO_PKG
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let mut set: BTreeSet<String> = BTreeSet::new();
    for caps in RE_GO_IMPORT_SINGLE.captures_iter(text) {
        set.insert(caps[1].to_string());
    }
    for block in RE_GO_IMPORT_BLOCK.captures_iter(text) {
        for caps in RE_GO_IMPORT_LINE.captures_iter(&block[1]) {
            set.insert(caps[1].to_string());
        }
    }
    (pkg, set.into_iter().collect())
}

fn dir_as_go_package(rel: &str) -> String {
    let dir = parent_dir(rel);
    if dir.is_empty() {
        return "main".into();
    }
    dir.rsplit('/').next().unwrap_or("main").to_string()
}

fn parent_dir(rel: &str) -> String {
    let rel = rel.replace('\\', "/");
    match rel.rfind('/') {
        Some(i) => rel[..i].trim_matches(['/', '.']).to_string(),
        None => String::new(),
    }
}

// --- TS/JS scanning --------------------------------------------------------

static RE_IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+[^;]*?\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});
static RE_IMPORT_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static RE_REQUIRE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static RE_EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*export\s*\{[^}]*\}\s*from\s*['"]([^'"]+)['"]"#).unwrap()
});

fn scan_ts_js(rel: &str, text: &str, resolver: Option<&TsResolver>) -> (String, Vec<String>) {
    let rel = rel.replace('\\', "/");
    let base_no_ext = strip_ext(&rel);
    let node = format!("js:{base_no_ext}");

    let mut set: BTreeSet<String> = BTreeSet::new();
    for re in [
        &*RE_IMPORT_FROM,
        &*RE_IMPORT_ONLY,
        &*RE_REQUIRE_CALL,
        &*RE_EXPORT_FROM,
    ] {
        for caps in re.captures_iter(text) {
            let spec = normalize_ts_spec(&base_no_ext, &caps[1], resolver);
            if !spec.is_empty() {
                set.insert(spec);
            }
        }
    }
    (node, set.into_iter().collect())
}

/// Resolve a TS/JS specifier into a node label:
/// relative → `js:<normalized-rel-without-ext>`, bare → tsconfig resolution
/// or `npm:<spec>`.
fn normalize_ts_spec(base_no_ext: &str, spec: &str, resolver: Option<&TsResolver>) -> String {
    if spec.is_empty() {
        return String::new();
    }
    if spec.starts_with('.') {
        let dir = match base_no_ext.rfind('/') {
            Some(i) => &base_no_ext[..i],
            None => "",
        };
        let joined = clean_join(dir, spec);
        let joined = strip_ext(&joined);
        return format!("js:{}", joined.trim_start_matches("./"));
    }
    if let Some(r) = resolver {
        if let Some(target) = r.resolve_bare(spec) {
            return format!("js:{}", strip_ext(&target));
        }
    }
    format!("npm:{spec}")
}

/// Drop the last extension of a path ("a/b.test.ts" -> "a/b.test").
fn strip_ext(p: &str) -> String {
    let base_start = p.rfind('/').map(|i| i + 1).unwrap_or(0);
    match p[base_start..].rfind('.') {
        Some(i) if i > 0 => p[..base_start + i].to_string(),
        _ => p.to_string(),
    }
}

/// Join and lexically clean a relative specifier against a directory.
fn clean_join(dir: &str, spec: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in dir.split('/').chain(spec.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                if stack.last().is_some_and(|&s| s != "..") {
                    stack.pop();
                } else {
                    stack.push("..");
                }
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

// --- tsconfig resolver -----------------------------------------------------

#[derive(Debug, Deserialize)]
struct TsConfigFile {
    #[serde(default, rename = "compilerOptions")]
    compiler_options: TsCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
struct TsCompilerOptions {
    #[serde(default, rename = "baseUrl")]
    base_url: String,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

/// Minimal tsconfig-based resolution for bare specifiers. Only
/// `compilerOptions.baseUrl` and `compilerOptions.paths` are considered;
/// for `paths` only the first target of each pattern is used. Computed
/// once per run as a pure value.
#[derive(Debug)]
pub struct TsResolver {
    root: PathBuf,
    base_url: String,
    /// (pattern, first target), patterns in sorted order.
    patterns: Vec<(String, String)>,
}

const TS_EXTS: [&str; 6] = [".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

impl TsResolver {
    /// Read `<root>/tsconfig.json`; absent or unparsable config disables
    /// bare-specifier resolution.
    pub fn load(root: &Path) -> Option<Self> {
        let data = fs::read(root.join("tsconfig.json")).ok()?;
        let raw: TsConfigFile = serde_json::from_slice(&data).ok()?;
        let patterns = raw
            .compiler_options
            .paths
            .into_iter()
            .filter_map(|(k, v)| {
                let first = v.into_iter().next()?;
                if first.is_empty() {
                    return None;
                }
                Some((k, first))
            })
            .collect();
        Some(Self {
            root: root.to_path_buf(),
            base_url: raw.compiler_options.base_url,
            patterns,
        })
    }

    /// Map a bare specifier to a repo-relative path with extension, if a
    /// matching file exists.
    pub fn resolve_bare(&self, spec: &str) -> Option<String> {
        if spec.is_empty() {
            return None;
        }
        for (key, target) in &self.patterns {
            if !key.contains('*') {
                if key == spec {
                    if let Some(rel) = self.find_existing(&trim_root_slash(target)) {
                        return Some(rel);
                    }
                }
                continue;
            }
            let (pre, suf) = key.split_once('*').unwrap();
            if spec.starts_with(pre) && spec.ends_with(suf) && spec.len() >= pre.len() + suf.len()
            {
                let mid = &spec[pre.len()..spec.len() - suf.len()];
                let candidate = target.replace('*', mid);
                if let Some(rel) = self.find_existing(&trim_root_slash(&candidate)) {
                    return Some(rel);
                }
            }
        }
        if !self.base_url.is_empty() {
            let joined = format!("{}/{}", self.base_url.trim_end_matches('/'), spec);
            if let Some(rel) = self.find_existing(&trim_root_slash(&joined)) {
                return Some(rel);
            }
        }
        None
    }

    /// Try the path as-is, then with the known TS/JS extensions, then as a
    /// directory containing `index.<ext>`.
    fn find_existing(&self, rel: &str) -> Option<String> {
        if rel.is_empty() {
            return None;
        }
        let abs = self.root.join(rel);
        if rel.rsplit('/').next().is_some_and(|b| b.contains('.')) && abs.is_file() {
            return Some(rel.to_string());
        }
        for ext in TS_EXTS {
            let candidate = format!("{rel}{ext}");
            if self.root.join(&candidate).is_file() {
                return Some(candidate);
            }
        }
        if abs.is_dir() {
            for ext in TS_EXTS {
                let candidate = format!("{rel}/index{ext}");
                if self.root.join(&candidate).is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

fn trim_root_slash(p: &str) -> String {
    p.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_java_collects_imports() {
        let src = "package org.acme;\nimport java.util.List;\nimport static org.junit.Assert.*;\n";
        let (pkg, imports) = scan_java(src);
        assert_eq!(pkg, "org.acme");
        assert_eq!(imports, vec!["java.util.List", "org.junit.Assert.*"]);
    }

    #[test]
    fn test_scan_go_single_and_block_imports() {
        let src = "package main\n\nimport \"fmt\"\n\nimport (\n\tio \"io\"\n\t\"os\"\n)\n";
        let (pkg, imports) = scan_go(src);
        assert_eq!(pkg, "main");
        assert_eq!(imports, vec!["fmt", "io", "os"]);
    }

    #[test]
    fn test_ts_relative_imports_normalize() {
        let src = "import { a } from './util';\nimport '../shared/env';\nconst x = require('./util');\nexport { b } from './other';\n";
        let (node, imports) = scan_ts_js("src/app/main.ts", src, None);
        assert_eq!(node, "js:src/app/main");
        assert_eq!(
            imports,
            vec!["js:src/app/other", "js:src/app/util", "js:src/shared/env"]
        );
    }

    #[test]
    fn test_ts_bare_specifier_falls_back_to_npm() {
        let (_, imports) = scan_ts_js("a.ts", "import React from 'react';\n", None);
        assert_eq!(imports, vec!["npm:react"]);
    }

    #[test]
    fn test_build_from_sorted_dedup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.go"),
            "package a\nimport \"fmt\"\nimport \"fmt\"\n",
        )
        .unwrap();
        let files = vec![GraphFile {
            rel_path: "a.go".into(),
            abs_path: dir.path().join("a.go"),
            ext: ".go".into(),
        }];
        let g = build_from(dir.path(), &files);
        assert_eq!(g.nodes, vec!["go:a", "go:fmt"]);
        assert_eq!(g.edges, vec![("go:a".into(), "go:fmt".into())]);
    }

    #[test]
    fn test_tsconfig_wildcard_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/lib")).unwrap();
        fs::write(dir.path().join("src/lib/core.ts"), "export const x = 1;\n").unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"baseUrl":"src","paths":{"@lib/*":["src/lib/*"]}}}"#,
        )
        .unwrap();

        let r = TsResolver::load(dir.path()).unwrap();
        assert_eq!(r.resolve_bare("@lib/core").as_deref(), Some("src/lib/core.ts"));
        assert_eq!(r.resolve_bare("missing"), None);
    }

    #[test]
    fn test_tsconfig_base_url_and_index_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/widgets")).unwrap();
        fs::write(dir.path().join("src/widgets/index.tsx"), "export {}\n").unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions":{"baseUrl":"src"}}"#,
        )
        .unwrap();

        let r = TsResolver::load(dir.path()).unwrap();
        assert_eq!(
            r.resolve_bare("widgets").as_deref(),
            Some("src/widgets/index.tsx")
        );
    }

    #[test]
    fn test_clean_join() {
        assert_eq!(clean_join("src/app", "./util"), "src/app/util");
        assert_eq!(clean_join("src/app", "../shared/env"), "src/shared/env");
        assert_eq!(clean_join("", "./x"), "x");
    }
}
