//! Filesystem walker adapter.
//!
//! Produces the ordered `(relPath, absPath, size, contentHash, extension)`
//! contract the pipeline consumes. Traversal and `.gitignore` semantics are
//! delegated to the `ignore` crate; filtering, hashing and the size budget
//! live here. The result is sorted by relative path before the total-size
//! budget is applied, so which files fall past the cap never depends on
//! directory iteration order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::Result;
use crate::hashing::sha256_hex_file;

/// A collected file as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Project-relative path with forward slashes.
    pub rel_path: String,
    /// Absolute filesystem path.
    pub abs_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256_hex: String,
    /// Lowercase extension including the dot, or empty.
    pub ext: String,
}

/// Walk configuration.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Allowed extensions (lowercase, with dot). Empty accepts everything.
    pub exts: BTreeSet<String>,
    /// Base-name prefixes to exclude (dirs and files).
    pub exclude: BTreeSet<String>,
    /// Substrings (case-insensitive) that force-include a path past the
    /// extension filter.
    pub includes: Vec<String>,
    /// Soft cap on the total collected bytes. 0 = no limit.
    pub max_bytes: u64,
    /// Per-file size cap. 0 = no limit.
    pub max_file_bytes: u64,
    /// Honor `.gitignore` patterns during the walk.
    pub use_gitignore: bool,
    /// Traverse symlinked files and directories.
    pub follow_symlinks: bool,
}

/// Collect candidate files under `src`, sorted by relative path.
pub fn collect_files(src: &Path, opts: &WalkOptions) -> Result<Vec<FileEntry>> {
    let src_abs = src
        .canonicalize()
        .unwrap_or_else(|_| src.to_path_buf());

    let exclude = opts.exclude.clone();
    let mut builder = WalkBuilder::new(&src_abs);
    builder
        .hidden(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .git_ignore(opts.use_gitignore)
        .require_git(false)
        .follow_links(opts.follow_symlinks)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let base = entry.file_name().to_string_lossy();
            !is_excluded(&base, &exclude)
        });

    let mut list = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let rel = match path.strip_prefix(&src_abs) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if rel.is_empty() || rel.starts_with("../") {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if opts.max_file_bytes > 0 && meta.len() > opts.max_file_bytes {
            continue;
        }

        let ext = extension_of(&rel);
        if !opts.exts.is_empty()
            && !opts.exts.contains(&ext)
            && !matches_include(&rel, &opts.includes)
        {
            continue;
        }

        let sha256_hex = match sha256_hex_file(path) {
            Ok(hex) => hex,
            Err(_) => continue,
        };

        list.push(FileEntry {
            rel_path: rel,
            abs_path: path.to_path_buf(),
            size: meta.len(),
            sha256_hex,
            ext,
        });
    }

    list.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    if opts.max_bytes > 0 {
        let mut total = 0u64;
        list.retain(|f| {
            if total + f.size > opts.max_bytes {
                return false;
            }
            total += f.size;
            true
        });
    }

    tracing::debug!("collected {} candidate files", list.len());
    Ok(list)
}

/// Lowercase extension of a relative path, including the dot.
pub fn extension_of(rel: &str) -> String {
    let base = rel.rsplit('/').next().unwrap_or(rel);
    match base.rfind('.') {
        Some(i) if i > 0 => base[i..].to_lowercase(),
        _ => String::new(),
    }
}

fn is_excluded(base: &str, exclude: &BTreeSet<String>) -> bool {
    if exclude.contains(base) {
        return true;
    }
    exclude.iter().any(|p| !p.is_empty() && base.starts_with(p))
}

fn matches_include(path: &str, includes: &[String]) -> bool {
    if includes.is_empty() {
        return false;
    }
    let lc = path.to_lowercase();
    includes
        .iter()
        .filter(|inc| !inc.is_empty())
        .any(|inc| lc.contains(&inc.to_lowercase()))
}
