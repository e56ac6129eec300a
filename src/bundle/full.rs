//! FULL bundle writer.
//!
//! Emission order: `manifest.json`, `symbols.json`, `BUNDLE.ID` (when the
//! manifest carries one), `graph.json`, optional `slices.jsonl` and
//! `pointers.jsonl`, `README.md`, `TOC.md`, optional `bench.txt`, and the
//! optional `src/<rel>` source stream.

use std::fs;
use std::path::{Path, PathBuf};

use super::readme::{generate_full_readme, ReadmeOptions};
use super::{create_archive, sanitize_path, write_json, write_jsonl, write_raw};
use crate::error::Result;
use crate::index::Artifacts;
use crate::lang::{present_langs, supported_langs};
use crate::textutil::{ensure_trailing_lf, normalize_utf8_lf};

/// Options for the FULL layout.
#[derive(Debug, Clone, Default)]
pub struct FullOptions {
    /// Include source copies under `src/`.
    pub emit_src: bool,
    /// Optional benchmark text file copied to `bench.txt`.
    pub bench_path: Option<PathBuf>,
    /// Unified diff context advertised in the README.
    pub diff_context: usize,
    /// Whether diff headers omit `a/`/`b/` prefixes (README note).
    pub diff_no_prefix: bool,
}

/// Write the FULL bundle archive. `src_files` are `(relPath, absPath)`
/// pairs of the files to stream under `src/` (already restricted to the
/// indexed set).
pub fn write_full(
    zip_path: &Path,
    src_files: &[(String, PathBuf)],
    art: &Artifacts,
    opts: &FullOptions,
) -> Result<()> {
    let mut zw = create_archive(zip_path)?;

    write_json(&mut zw, "manifest.json", &art.manifest)?;
    write_json(&mut zw, "symbols.json", &art.symbols)?;
    if !art.manifest.bundle_id.is_empty() {
        let id = ensure_trailing_lf(normalize_utf8_lf(art.manifest.bundle_id.as_bytes()));
        write_raw(&mut zw, "BUNDLE.ID", id.as_bytes())?;
    }
    write_json(&mut zw, "graph.json", &art.graph)?;

    if !art.slices.is_empty() {
        let mut sorted = art.slices.clone();
        sorted.sort_by(|a, b| {
            (a.path.as_str(), a.start, a.end).cmp(&(b.path.as_str(), b.start, b.end))
        });
        write_jsonl(&mut zw, "slices.jsonl", &sorted)?;
    }
    if !art.pointers.is_empty() {
        let mut sorted = art.pointers.clone();
        sorted.sort_by(|a, b| {
            (a.id.as_str(), a.path.as_str(), a.start, a.end)
                .cmp(&(b.id.as_str(), b.path.as_str(), b.start, b.end))
        });
        write_jsonl(&mut zw, "pointers.jsonl", &sorted)?;
    }

    let readme_opts = ReadmeOptions {
        module_name: art.manifest.module.clone(),
        supported_langs: supported_langs().iter().map(|s| s.to_string()).collect(),
        present_langs: present_langs(art.manifest.files.iter().map(|f| f.path.as_str())),
        diff_no_prefix: opts.diff_no_prefix,
        context_lines: opts.diff_context,
        include_bench_note: opts.bench_path.is_some(),
    };
    let readme = ensure_trailing_lf(generate_full_readme(&readme_opts));
    write_raw(&mut zw, "README.md", readme.as_bytes())?;

    let toc = ensure_trailing_lf(render_toc(art));
    write_raw(&mut zw, "TOC.md", toc.as_bytes())?;

    if let Some(bench) = &opts.bench_path {
        write_raw(&mut zw, "bench.txt", &fs::read(bench)?)?;
    }

    if opts.emit_src && !src_files.is_empty() {
        let mut sorted = src_files.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (rel, abs) in &sorted {
            let name = sanitize_path(&format!("src/{rel}"));
            write_raw(&mut zw, &name, &fs::read(abs)?)?;
        }
    }

    zw.finish()?;
    Ok(())
}

fn render_toc(art: &Artifacts) -> String {
    let mut out = String::from("# TOC\n\n| # | Path | Lines |\n|---:|:-----|-----:|\n");
    for (i, f) in art.manifest.files.iter().enumerate() {
        out.push_str(&format!("| {} | {} | {} |\n", i + 1, f.path, f.lines));
    }
    out
}
