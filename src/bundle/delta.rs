//! DELTA bundle writer.
//!
//! Layout, in emission order: `delta.index.json`, per-file patches under
//! `diffs/<safeName>.patch` (sorted), new file bodies under `added/<rel>`
//! (sorted), a single aggregated `delta.patch`, `SUMMARY.md`, `README.md`
//! and an optional `bench.txt`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::readme::{generate_delta_readme, ReadmeOptions};
use super::{create_archive, ensure_unique_name, sanitize_path, write_json, write_raw};
use crate::delta::{ChangedFile, Delta, RenamedFile};
use crate::diffs::{added, DiffOptions};
use crate::error::Result;
use crate::snapshot::SnapFile;
use crate::textutil::{ensure_trailing_lf, join_with_single_nl};

/// Machine-readable index written to `delta.index.json`. Lists are always
/// present, `[]` when empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeltaIndex {
    #[serde(rename = "baseModule")]
    pub base_module: String,
    #[serde(rename = "baseSnapshot")]
    pub base_snapshot: String,
    #[serde(rename = "headSnapshot")]
    pub head_snapshot: String,
    pub added: Vec<SnapFile>,
    pub removed: Vec<SnapFile>,
    pub renamed: Vec<RenamedFile>,
    pub changed: Vec<ChangedFile>,
}

impl DeltaIndex {
    /// Assemble the index from a computed delta and snapshot stamps.
    pub fn from_delta(delta: &Delta, base_module: &str, base: &str, head: &str) -> Self {
        Self {
            base_module: base_module.into(),
            base_snapshot: base.into(),
            head_snapshot: head.into(),
            added: delta.added.clone(),
            removed: delta.removed.clone(),
            renamed: delta.renamed.clone(),
            changed: delta.changed.clone(),
        }
    }
}

/// Options for the DELTA layout.
#[derive(Debug, Clone, Default)]
pub struct DeltaBundleOptions {
    pub readme: ReadmeOptionsSource,
    pub bench_path: Option<PathBuf>,
    /// Options used to synthesize `/dev/null` diffs for added files inside
    /// the aggregated `delta.patch`.
    pub diff: DiffOptions,
}

/// README inputs the caller already knows.
#[derive(Debug, Clone, Default)]
pub struct ReadmeOptionsSource {
    pub module_name: String,
    pub supported_langs: Vec<String>,
    pub present_langs: Vec<String>,
    pub diff_no_prefix: bool,
    pub context_lines: usize,
}

/// Write the DELTA bundle archive. `diffs` maps patch file names (without
/// the `diffs/` prefix) to patch bodies; `added_files` are
/// `(relPath, absPath)` pairs for the new files.
pub fn write_delta(
    zip_path: &Path,
    index: &DeltaIndex,
    diffs: &BTreeMap<String, String>,
    added_files: &[(String, PathBuf)],
    opts: &DeltaBundleOptions,
) -> Result<()> {
    let mut zw = create_archive(zip_path)?;

    write_json(&mut zw, "delta.index.json", index)?;

    // Per-file patches, sorted by name; names are sanitized and
    // de-duplicated defensively.
    let mut used = BTreeSet::new();
    for (name, body) in diffs {
        let entry = ensure_unique_name(&sanitize_path(&format!("diffs/{name}")), &mut used);
        write_raw(&mut zw, &entry, body.as_bytes())?;
    }

    // Added file bodies, sorted by relative path.
    let mut sorted_added = added_files.to_vec();
    sorted_added.sort_by(|a, b| a.0.cmp(&b.0));
    let mut used = BTreeSet::new();
    for (rel, abs) in &sorted_added {
        let entry = ensure_unique_name(&sanitize_path(&format!("added/{rel}")), &mut used);
        write_raw(&mut zw, &entry, &fs::read(abs)?)?;
    }

    let aggregated = aggregate_patch(diffs, &sorted_added, opts.diff)?;
    write_raw(&mut zw, "delta.patch", aggregated.as_bytes())?;

    let summary = ensure_trailing_lf(render_summary(index));
    write_raw(&mut zw, "SUMMARY.md", summary.as_bytes())?;

    let readme_opts = ReadmeOptions {
        module_name: opts.readme.module_name.clone(),
        supported_langs: opts.readme.supported_langs.clone(),
        present_langs: opts.readme.present_langs.clone(),
        diff_no_prefix: opts.readme.diff_no_prefix,
        context_lines: opts.readme.context_lines,
        include_bench_note: opts.bench_path.is_some(),
    };
    let readme = ensure_trailing_lf(generate_delta_readme(&readme_opts));
    write_raw(&mut zw, "README.md", readme.as_bytes())?;

    if let Some(bench) = &opts.bench_path {
        write_raw(&mut zw, "bench.txt", &fs::read(bench)?)?;
    }

    zw.finish()?;
    Ok(())
}

/// Build the aggregated `delta.patch`: all per-file diffs plus synthesized
/// `/dev/null` diffs for added files, concatenated sorted by entry name
/// with single-LF joins.
fn aggregate_patch(
    diffs: &BTreeMap<String, String>,
    sorted_added: &[(String, PathBuf)],
    diff_opts: DiffOptions,
) -> Result<String> {
    let mut entries: BTreeMap<String, String> = BTreeMap::new();
    for (name, body) in diffs {
        entries.insert(format!("diffs/{name}"), body.clone());
    }
    for (rel, abs) in sorted_added {
        let data = fs::read(abs)?;
        let (body, _) = added(rel, &data, diff_opts);
        entries.insert(format!("added/{rel}"), body);
    }
    let chunks: Vec<String> = entries.into_values().collect();
    Ok(ensure_trailing_lf(join_with_single_nl(&chunks)))
}

fn render_summary(index: &DeltaIndex) -> String {
    let oversize = index.changed.iter().filter(|c| c.oversize).count();
    let mut out = String::from("# Delta Summary\n\n");
    out.push_str(&format!("- Added: {}\n", index.added.len()));
    out.push_str(&format!("- Removed: {}\n", index.removed.len()));
    out.push_str(&format!("- Changed: {}\n", index.changed.len()));
    out.push_str(&format!("- Renamed: {}\n", index.renamed.len()));
    out.push_str(&format!("- Oversize diffs: {oversize}\n"));

    if !index.added.is_empty() {
        out.push_str("\n## Added\n");
        for f in &index.added {
            out.push_str(&format!("- {}\n", f.path));
        }
    }
    if !index.removed.is_empty() {
        out.push_str("\n## Removed\n");
        for f in &index.removed {
            out.push_str(&format!("- {}\n", f.path));
        }
    }
    if !index.renamed.is_empty() {
        out.push_str("\n## Renamed\n");
        for r in &index.renamed {
            out.push_str(&format!("- {} -> {}\n", r.from, r.to));
        }
    }
    if !index.changed.is_empty() {
        out.push_str("\n## Changed\n");
        for c in &index.changed {
            out.push_str(&format!("- {} ({})\n", c.path, c.diff_path));
        }
    }
    out
}
