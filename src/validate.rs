//! Structural validation of the assembled manifest and symbol list.
//!
//! Not a JSON-Schema validator; these are the semantic checks that
//! commonly catch bad bundles (path shape, hash shape, line ranges,
//! duplicates, sortedness). All issues are accumulated and returned as a
//! single aggregated error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BundleError, Result};
use crate::index::{ManFile, Manifest, Symbol, Symbols};

static RE_HEX64: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// Validate the manifest. Returns a single error listing every issue
/// found, or `Ok(())`.
pub fn manifest(m: &Manifest) -> Result<()> {
    let mut issues = Issues::default();

    if m.module.trim().is_empty() {
        issues.add("manifest.module must be non-empty".into());
    }

    let mut seen = std::collections::HashSet::new();
    for (i, f) in m.files.iter().enumerate() {
        let prefix = format!("files[{i}] ({})", f.path);

        if f.path.is_empty() {
            issues.add(format!("{prefix}: path must be non-empty"));
        } else {
            if f.path.starts_with('/') || f.path.starts_with('\\') {
                issues.add(format!(
                    "{prefix}: path must not start with a slash (got {:?})",
                    f.path
                ));
            }
            if f.path.contains('\\') {
                issues.add(format!(
                    "{prefix}: path must use forward slashes ('/'), found backslash"
                ));
            }
            if has_dot_dot(&f.path) {
                issues.add(format!(
                    "{prefix}: path must not contain '..' segments (got {:?})",
                    f.path
                ));
            }
        }

        if !f.path.is_empty() && !seen.insert(f.path.as_str()) {
            issues.add(format!("{prefix}: duplicate file path {:?}", f.path));
        }

        if !f.hash.is_empty() && !RE_HEX64.is_match(&f.hash) {
            issues.add(format!(
                "{prefix}: hash must be 64 lowercase hex chars (sha256), got {:?}",
                f.hash
            ));
        }

        if f.lines < 1 {
            issues.add(format!("{prefix}: lines must be >= 1 (got {})", f.lines));
        }

        for (j, a) in f.anchors.iter().enumerate() {
            let ap = format!("{prefix}.anchors[{j}] ({})", a.name);
            if a.name.trim().is_empty() {
                issues.add(format!("{ap}: name must be non-empty"));
            }
            if a.start < 1 {
                issues.add(format!("{ap}: start must be >= 1 (got {})", a.start));
            }
            if a.end < a.start {
                issues.add(format!(
                    "{ap}: end must be >= start (start={}, end={})",
                    a.start, a.end
                ));
            }
            if f.lines > 0 && a.end > f.lines {
                issues.add(format!(
                    "{ap}: end must be <= file lines ({}), got {}",
                    f.lines, a.end
                ));
            }
        }
    }

    if !is_sorted_by_path(&m.files) {
        issues.add("manifest.files should be sorted by path for deterministic bundles".into());
    }

    issues.into_result()
}

/// Validate the flat symbols list.
pub fn symbols(s: &Symbols) -> Result<()> {
    let mut issues = Issues::default();

    if s.version < 1 {
        issues.add(format!("symbols.version must be >= 1 (got {})", s.version));
    }

    for (i, sym) in s.symbols.iter().enumerate() {
        let prefix = format!("symbols[{i}] ({})", sym.qname);
        if sym.qname.trim().is_empty() {
            issues.add(format!("{prefix}: symbol must be non-empty"));
        }
        if sym.path.trim().is_empty() {
            issues.add(format!("{prefix}: path must be non-empty"));
        } else {
            if sym.path.starts_with('/') {
                issues.add(format!(
                    "{prefix}: path must be relative, got absolute {:?}",
                    sym.path
                ));
            }
            if sym.path.contains('\\') {
                issues.add(format!(
                    "{prefix}: path must use forward slashes ('/'), found backslash"
                ));
            }
            if has_dot_dot(&sym.path) {
                issues.add(format!("{prefix}: path must not contain '..' segments"));
            }
        }
        if sym.start < 1 {
            issues.add(format!("{prefix}: start must be >= 1 (got {})", sym.start));
        }
        if sym.end < sym.start {
            issues.add(format!(
                "{prefix}: end must be >= start (start={}, end={})",
                sym.start, sym.end
            ));
        }
    }

    if !is_sorted_symbols(&s.symbols) {
        issues.add("symbols list should be sorted (path, start, end) for determinism".into());
    }

    issues.into_result()
}

fn has_dot_dot(p: &str) -> bool {
    p.split('/').any(|seg| seg == "..")
}

fn is_sorted_by_path(files: &[ManFile]) -> bool {
    files.windows(2).all(|w| w[0].path <= w[1].path)
}

fn is_sorted_symbols(syms: &[Symbol]) -> bool {
    syms.windows(2).all(|w| {
        (w[0].path.as_str(), w[0].start, w[0].end) <= (w[1].path.as_str(), w[1].start, w[1].end)
    })
}

/// Aggregates validation issues into one error.
#[derive(Default)]
struct Issues {
    msgs: Vec<String>,
}

impl Issues {
    fn add(&mut self, msg: String) {
        self.msgs.push(msg);
    }

    fn into_result(self) -> Result<()> {
        if self.msgs.is_empty() {
            Ok(())
        } else {
            Err(BundleError::Validation {
                issues: self.msgs.join("\n"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Anchor;

    fn valid_file(path: &str) -> ManFile {
        ManFile {
            path: path.into(),
            hash: "ab".repeat(32),
            lines: 10,
            ..ManFile::default()
        }
    }

    fn valid_manifest() -> Manifest {
        Manifest {
            module: "m".into(),
            files: vec![valid_file("a.go"), valid_file("b.go")],
            ..Manifest::default()
        }
    }

    #[test]
    fn test_valid_manifest_passes() {
        assert!(manifest(&valid_manifest()).is_ok());
    }

    #[test]
    fn test_issues_are_aggregated() {
        let mut m = valid_manifest();
        m.module = String::new();
        m.files[0].hash = "UPPER".into();
        m.files[1].path = "../escape.go".into();
        let err = manifest(&m).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("module must be non-empty"));
        assert!(text.contains("hash must be 64 lowercase hex"));
        assert!(text.contains("'..' segments"));
    }

    #[test]
    fn test_anchor_ranges_checked_against_lines() {
        let mut m = valid_manifest();
        m.files[0].anchors = vec![Anchor {
            name: "X".into(),
            start: 5,
            end: 99,
        }];
        let err = manifest(&m).unwrap_err();
        assert!(err.to_string().contains("end must be <= file lines"));
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let mut m = valid_manifest();
        m.files[1].path = "a.go".into();
        let err = manifest(&m).unwrap_err();
        assert!(err.to_string().contains("duplicate file path"));
    }

    #[test]
    fn test_unsorted_files_flagged() {
        let mut m = valid_manifest();
        m.files.swap(0, 1);
        let err = manifest(&m).unwrap_err();
        assert!(err.to_string().contains("sorted by path"));
    }

    #[test]
    fn test_symbols_validation() {
        let ok = Symbols {
            version: 1,
            symbols: vec![Symbol {
                qname: "pkg.F".into(),
                kind: "func".into(),
                path: "a.go".into(),
                start: 1,
                end: 3,
            }],
        };
        assert!(symbols(&ok).is_ok());

        let bad = Symbols {
            version: 0,
            symbols: vec![Symbol {
                qname: "".into(),
                kind: "func".into(),
                path: "/abs.go".into(),
                start: 0,
                end: 0,
            }],
        };
        let text = symbols(&bad).unwrap_err().to_string();
        assert!(text.contains("version must be >= 1"));
        assert!(text.contains("symbol must be non-empty"));
        assert!(text.contains("absolute"));
        assert!(text.contains("start must be >= 1"));
    }
}
