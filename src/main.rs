//! sourcepack CLI entry point.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use sourcepack::bundle::chat::{write_chat, ChatOptions};
use sourcepack::bundle::delta::{write_delta, DeltaBundleOptions, DeltaIndex, ReadmeOptionsSource};
use sourcepack::bundle::full::{write_full, FullOptions};
use sourcepack::cli::{Cli, Mode};
use sourcepack::delta::{build_delta, DeltaOptions, DualTreeProvider, SimilarityOptions};
use sourcepack::diffs::{make_diffs, DiffOptions};
use sourcepack::index::{build_artifacts, AutoAnchorConfig, IndexOptions};
use sourcepack::lang::{present_langs, supported_langs};
use sourcepack::snapshot::{self, SnapFile, Snapshot};
use sourcepack::textutil::count_lines;
use sourcepack::walk::{collect_files, FileEntry, WalkOptions};
use sourcepack::{meta, validate, Result};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let src_abs = cli
        .src_dir
        .canonicalize()
        .unwrap_or_else(|_| cli.src_dir.clone());
    let cc_dir = snapshot::cache_dir(&cli.tmp_dir, &src_abs);
    if cli.new {
        snapshot::clear(&cc_dir)?;
    }

    let mode = cli.mode();

    let mut walk_opts = WalkOptions {
        exts: cli.ext_set(),
        exclude: cli.exclude_set(),
        includes: cli.include_list(),
        max_bytes: cli.max_bytes,
        max_file_bytes: cli.max_file_bytes,
        use_gitignore: cli.use_gitignore,
        follow_symlinks: cli.follow_symlinks,
    };
    if matches!(mode, Mode::Delta(_)) && walk_opts.max_bytes > 0 {
        // Delta needs every candidate for an accurate snapshot.
        tracing::debug!("ignoring --max-bytes in delta mode");
        walk_opts.max_bytes = 0;
    }

    let files = collect_files(&src_abs, &walk_opts)?;
    if files.is_empty() {
        return Ok("No files matched filters.".into());
    }

    let curr = build_snapshot(&src_abs, &files, &cc_dir, cli.store_blobs)?;

    match mode {
        Mode::Delta(out) => run_delta(cli, &out, &src_abs, &cc_dir, &files, &curr),
        Mode::Chat(out) => run_chat(cli, &out, &src_abs, &files),
        Mode::Full(out) => run_full(cli, &out, &src_abs, &cc_dir, &files, &curr),
    }
}

/// Record the current tree state; optionally store content-addressed blobs
/// so a later delta can reconstruct old file bodies.
fn build_snapshot(
    src_abs: &Path,
    files: &[FileEntry],
    cc_dir: &Path,
    store_blobs: bool,
) -> Result<Snapshot> {
    let module = src_abs
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "bundle".into());
    let mut snap = Snapshot {
        module,
        created: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        format_version: "1".into(),
        files: Vec::with_capacity(files.len()),
    };
    for f in files {
        let Ok(data) = fs::read(&f.abs_path) else {
            continue;
        };
        snap.files.push(SnapFile {
            path: f.rel_path.clone(),
            hash: f.sha256_hex.clone(),
            lines: count_lines(&data),
        });
        if store_blobs && f.sha256_hex.len() >= 6 {
            snapshot::save_blob(cc_dir, &f.sha256_hex, &data)?;
        }
    }
    Ok(snap)
}

fn index_options(cli: &Cli) -> IndexOptions {
    IndexOptions {
        max_file_lines: cli.max_file_lines,
        lang_hints: cli.lang_hints(),
        auto_anchors: AutoAnchorConfig {
            enabled: cli.auto_anchors,
            min_lines: cli.auto_anchors_min_lines,
            max_per_file: cli.auto_anchors_max_per_file,
            include_imports: cli.auto_anchors_imports,
            include_tests: cli.auto_anchors_tests,
            prefix: cli.auto_anchors_prefix.clone(),
        },
    }
}

fn diff_options(cli: &Cli) -> DiffOptions {
    DiffOptions {
        max_bytes: cli.max_diff_bytes,
        context: cli.diff_context,
        no_prefix: cli.diff_no_prefix,
    }
}

/// `(relPath, absPath)` pairs restricted to the indexed manifest set.
fn indexed_src_files(
    files: &[FileEntry],
    indexed: &BTreeSet<&str>,
) -> Vec<(String, PathBuf)> {
    let mut out: Vec<(String, PathBuf)> = files
        .iter()
        .filter(|f| indexed.contains(f.rel_path.as_str()))
        .map(|f| (f.rel_path.clone(), f.abs_path.clone()))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn run_full(
    cli: &Cli,
    out: &Path,
    src_abs: &Path,
    cc_dir: &Path,
    files: &[FileEntry],
    curr: &Snapshot,
) -> Result<String> {
    let art = {
        let mut art = build_artifacts(src_abs, files, &index_options(cli))?;
        let info = meta::detect(src_abs);
        meta::apply_to_manifest(&info, &mut art.manifest);
        art
    };

    if cli.validate {
        validate::manifest(&art.manifest)?;
        validate::symbols(&art.symbols)?;
    }

    let src_files = if cli.emit_src {
        let indexed: BTreeSet<&str> = art.manifest.files.iter().map(|f| f.path.as_str()).collect();
        indexed_src_files(files, &indexed)
    } else {
        Vec::new()
    };

    write_full(
        out,
        &src_files,
        &art,
        &FullOptions {
            emit_src: cli.emit_src,
            bench_path: cli.bench.clone(),
            diff_context: cli.diff_context,
            diff_no_prefix: cli.diff_no_prefix,
        },
    )?;

    if cli.save_snapshot {
        snapshot::save(cc_dir, curr)?;
    }

    Ok(format!(
        "Wrote bundle {} (files={}, symbols={}, slices={}, pointers={})",
        out.display(),
        art.manifest.files.len(),
        art.symbols.symbols.len(),
        art.slices.len(),
        art.pointers.len()
    ))
}

fn run_delta(
    cli: &Cli,
    out: &Path,
    src_abs: &Path,
    cc_dir: &Path,
    files: &[FileEntry],
    curr: &Snapshot,
) -> Result<String> {
    let prev = snapshot::load(cc_dir)?.unwrap_or_else(|| Snapshot {
        module: curr.module.clone(),
        ..Snapshot::default()
    });

    let provider;
    let mut delta_opts = DeltaOptions::default();
    if cli.rename_similarity {
        if let Some(old_root) = &cli.rename_sim_oldroot {
            provider = DualTreeProvider {
                old_root: old_root.clone(),
                new_root: src_abs.to_path_buf(),
            };
            delta_opts.similarity = Some(SimilarityOptions {
                threshold: cli.rename_sim_thresh,
                provider: &provider,
            });
        }
    }

    let mut delta = build_delta(&prev, curr, &delta_opts);

    let read_old = |hash: &str| -> std::io::Result<Vec<u8>> {
        snapshot::read_blob(cc_dir, hash).map_err(|e| std::io::Error::other(e.to_string()))
    };
    let diffs = make_diffs(&mut delta, files, diff_options(cli), Some(&read_old));

    let index = DeltaIndex::from_delta(&delta, &curr.module, &prev.created, &curr.created);

    let by_rel: BTreeMap<&str, &PathBuf> =
        files.iter().map(|f| (f.rel_path.as_str(), &f.abs_path)).collect();
    let added_files: Vec<(String, PathBuf)> = delta
        .added
        .iter()
        .filter_map(|a| by_rel.get(a.path.as_str()).map(|abs| (a.path.clone(), (*abs).clone())))
        .collect();

    write_delta(
        out,
        &index,
        &diffs,
        &added_files,
        &DeltaBundleOptions {
            readme: ReadmeOptionsSource {
                module_name: curr.module.clone(),
                supported_langs: supported_langs().iter().map(|s| s.to_string()).collect(),
                present_langs: present_langs(curr.files.iter().map(|f| f.path.as_str())),
                diff_no_prefix: cli.diff_no_prefix,
                context_lines: cli.diff_context,
            },
            bench_path: cli.bench.clone(),
            diff: diff_options(cli),
        },
    )?;

    snapshot::save(cc_dir, curr)?;

    let oversize = delta.changed.iter().filter(|c| c.oversize).count();
    Ok(format!(
        "Wrote delta bundle {} (added={}, removed={}, changed={}, renamed={}, oversize={})",
        out.display(),
        delta.added.len(),
        delta.removed.len(),
        delta.changed.len(),
        delta.renamed.len(),
        oversize
    ))
}

fn run_chat(cli: &Cli, out: &Path, src_abs: &Path, files: &[FileEntry]) -> Result<String> {
    let art = build_artifacts(src_abs, files, &index_options(cli))?;

    let indexed: BTreeSet<&str> = art.manifest.files.iter().map(|f| f.path.as_str()).collect();
    let src_files = indexed_src_files(files, &indexed);

    write_chat(
        out,
        &art.manifest,
        &src_files,
        &art.symbols,
        &art.graph,
        &ChatOptions {
            max_classes: cli.chat_max_classes,
            max_chars: cli.chat_max_chars,
            bench_path: cli.bench.clone(),
        },
    )?;

    Ok(format!(
        "Wrote chat bundle {} (files={})",
        out.display(),
        art.manifest.files.len()
    ))
}
