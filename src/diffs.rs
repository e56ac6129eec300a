//! Unified diff generation for changed files, plus patch naming.
//!
//! The diff text itself comes from the `similar` crate; this module owns
//! the conventions around it: default context of 4 lines, optional `a/`
//! and `b/` prefixes, the oversize placeholder body (no textual ellipses),
//! and Windows-safe, collision-free patch filenames.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use once_cell::sync::Lazy;
use regex::Regex;
use similar::TextDiff;

use crate::delta::Delta;
use crate::hashing::sha256_hex;
use crate::walk::FileEntry;

/// Patch generation options.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    /// Guardrail on input size (old + new bytes). When exceeded, a minimal
    /// placeholder patch is returned and oversize is set. 0 = no limit.
    pub max_bytes: usize,
    /// Context lines in unified hunks. 0 falls back to 4.
    pub context: usize,
    /// When true, `a/` and `b/` prefixes are omitted from headers.
    pub no_prefix: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            context: 4,
            no_prefix: false,
        }
    }
}

impl DiffOptions {
    fn context_lines(&self) -> usize {
        if self.context == 0 {
            4
        } else {
            self.context
        }
    }
}

/// Produce a classic unified patch for a -> b. Returns the patch body and
/// whether it was omitted as oversize.
pub fn unified(a_name: &str, b_name: &str, a: &[u8], b: &[u8], opt: DiffOptions) -> (String, bool) {
    if opt.max_bytes > 0 && a.len() + b.len() > opt.max_bytes {
        return (omitted(a_name, b_name), true);
    }
    let a_text = String::from_utf8_lossy(a);
    let b_text = String::from_utf8_lossy(b);
    let diff = TextDiff::from_lines(a_text.as_ref(), b_text.as_ref());
    let body = diff
        .unified_diff()
        .context_radius(opt.context_lines())
        .missing_newline_hint(false)
        .header(a_name, b_name)
        .to_string();
    if body.is_empty() {
        // Identical inputs; emit the placeholder rather than an empty patch.
        return (omitted(a_name, b_name), false);
    }
    (body, false)
}

/// Produce a patch that adds the entire content of `b` (old side is
/// `/dev/null`).
pub fn added(b_name: &str, b: &[u8], opt: DiffOptions) -> (String, bool) {
    if opt.max_bytes > 0 && b.len() > opt.max_bytes {
        return (omitted("/dev/null", b_name), true);
    }
    let b_name = b_name.strip_prefix("b/").unwrap_or(b_name);
    let b_text = String::from_utf8_lossy(b);
    let diff = TextDiff::from_lines("", b_text.as_ref());
    let body = diff
        .unified_diff()
        .context_radius(opt.context_lines())
        .missing_newline_hint(false)
        .header("/dev/null", b_name)
        .to_string();
    if body.is_empty() {
        return (omitted("/dev/null", b_name), false);
    }
    (body, false)
}

/// Compact placeholder used when size limits are exceeded.
fn omitted(a_name: &str, b_name: &str) -> String {
    format!("--- {a_name}\n+++ {b_name}\n@@\n# diff omitted (oversize)\n")
}

static INVALID_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\:*?"<>|]"#).unwrap());

/// Filesystem-safe patch base name (without the `.patch` extension):
/// slashes become underscores, Windows-invalid characters are replaced,
/// leading dots/underscores are trimmed.
pub fn safe_diff_base(path: &str) -> String {
    let base = path.replace('\\', "/").replace('/', "_");
    let base = INVALID_FILE_CHARS.replace_all(&base, "_");
    let base = base.trim_start_matches(['.', '_']);
    if base.is_empty() {
        "patch".into()
    } else {
        base.to_string()
    }
}

/// First 8 hex chars of sha256(s), used as a stable collision suffix.
fn short_hash(s: &str) -> String {
    sha256_hex(s.as_bytes())[..8].to_string()
}

/// Build a unique patch filename. On collision, a suffix from `hash_hint`
/// (or a hash of the base) is appended; a second collision appends one
/// more short fingerprint. Mutates `used`.
pub fn unique_patch_name(base: &str, hash_hint: &str, used: &mut BTreeSet<String>) -> String {
    let name = format!("{base}.patch");
    if used.insert(name.clone()) {
        return name;
    }
    let suffix = if hash_hint.is_empty() {
        short_hash(base)
    } else {
        hash_hint.to_string()
    };
    let name = format!("{base}-{suffix}.patch");
    if used.insert(name.clone()) {
        return name;
    }
    let name = format!("{base}-{suffix}-{}.patch", short_hash(&format!("{base}{suffix}")));
    used.insert(name.clone());
    name
}

/// Generate patches for `delta.changed`, filling each entry's `diff_path`
/// and `oversize`. `read_old` resolves previous contents by hash (usually
/// from the blob store); when the old side is unavailable the patch is
/// generated as an added-file patch.
pub fn make_diffs(
    delta: &mut Delta,
    files: &[FileEntry],
    opt: DiffOptions,
    read_old: Option<&dyn Fn(&str) -> std::io::Result<Vec<u8>>>,
) -> BTreeMap<String, String> {
    let by_path: BTreeMap<&str, &FileEntry> =
        files.iter().map(|f| (f.rel_path.as_str(), f)).collect();

    let mut out = BTreeMap::new();
    let mut used_names = BTreeSet::new();

    for chg in &mut delta.changed {
        let old_data = read_old
            .and_then(|f| f(&chg.hash_before).ok())
            .filter(|data| !data.is_empty())
            .unwrap_or_default();
        let new_data = by_path
            .get(chg.path.as_str())
            .and_then(|f| fs::read(&f.abs_path).ok())
            .unwrap_or_default();

        let base = safe_diff_base(&chg.path);
        let hash_hint = if chg.hash_after.is_empty() {
            short_hash(&chg.path)
        } else {
            chg.hash_after.clone()
        };
        let hint = &hash_hint[..hash_hint.len().min(8)];
        let patch_name = unique_patch_name(&base, hint, &mut used_names);

        let (body, oversize) = diff_file(&chg.path, opt, &old_data, &new_data);
        chg.oversize = oversize;
        chg.diff_path = format!("diffs/{patch_name}");
        out.insert(patch_name, body);
    }
    out
}

fn diff_file(path: &str, opt: DiffOptions, old_data: &[u8], new_data: &[u8]) -> (String, bool) {
    let (a_name, b_name) = if opt.no_prefix {
        (path.to_string(), path.to_string())
    } else {
        (format!("a/{path}"), format!("b/{path}"))
    };
    if old_data.is_empty() {
        return added(&b_name, new_data, opt);
    }
    let (body, oversize) = unified(&a_name, &b_name, old_data, new_data, opt);
    if too_short_or_no_hunks(&body) {
        return added(&b_name, new_data, opt);
    }
    (body, oversize)
}

/// Heuristic for suspicious patch bodies: require at least one `@@` hunk
/// header and a minimal length, otherwise the change is rewritten as an
/// added-file patch.
fn too_short_or_no_hunks(body: &str) -> bool {
    body.len() < 32 || !body.contains("@@")
}
