//! Deterministic README generation for FULL and DELTA bundles.
//!
//! Rendered without timestamps or environment data so archives stay
//! byte-identical across runs. Trailing whitespace is stripped per line
//! and a trailing newline is guaranteed.

/// README rendering knobs.
#[derive(Debug, Clone, Default)]
pub struct ReadmeOptions {
    pub module_name: String,
    pub supported_langs: Vec<String>,
    pub present_langs: Vec<String>,
    pub diff_no_prefix: bool,
    pub context_lines: usize,
    pub include_bench_note: bool,
}

pub fn generate_full_readme(opts: &ReadmeOptions) -> String {
    let module = module_name(opts);
    let mut out = String::new();
    out.push_str(&format!("# {module}\n\n"));
    out.push_str(
        "This archive is a **FULL bundle** produced by *sourcepack*. It contains a project snapshot plus indexing metadata for better model comprehension.\n\n",
    );
    out.push_str("## Bundle layout\n");
    out.push_str("- **manifest.json** — bundle manifest (files, hashes, anchors, bundle id).\n");
    out.push_str("- **symbols.json** — per-file, per-language symbol index (packages/namespaces, types, members).\n");
    out.push_str("- **slices.jsonl** — code/content slices with 1-based line anchors.\n");
    out.push_str("- **pointers.jsonl** — stable jump ids (file#anchor and symbol ids).\n");
    out.push_str("- **graph.json** — lightweight import graph (if available).\n");
    out.push_str("- **TOC.md** — table of contents for human reading.\n");
    out.push_str("- **src/** — optional source tree (when emitted).\n\n");
    out.push_str("## Anchors, slices, pointers (quick guide)\n");
    out.push_str("- Line numbers are **1-based**, ranges inclusive on both ends.\n");
    out.push_str(
        "- A *slice* is a stable textual region in a file: { \"path\", \"slice\", \"start\", \"end\" }.\n",
    );
    out.push_str(
        "- A *pointer* is a stable jump id referencing an anchor or a symbol; consumers should not assume file ordering.\n",
    );
    out.push_str(
        "- Consumers should tolerate missing optional fields — formats are forward compatible.\n\n",
    );
    push_conventions(&mut out, opts);
    if opts.include_bench_note {
        push_bench_note(&mut out);
    }
    out.push_str("## FAQ\n");
    out.push_str(
        "- **Why no \"...\" inside diffs?** Because many consumers treat literal ellipses as syntax, not truncation. Oversize content uses a dedicated placeholder hunk.\n",
    );
    out.push_str(
        "- **Are JSON schemas stable?** Yes; consumers should ignore unknown fields for forward compatibility.\n",
    );
    finish(out)
}

pub fn generate_delta_readme(opts: &ReadmeOptions) -> String {
    let module = module_name(opts);
    let mut out = String::new();
    out.push_str(&format!("# {module} — DELTA bundle\n\n"));
    out.push_str(
        "This archive is a **DELTA bundle** produced by *sourcepack*. It contains a compact view of changes since a prior snapshot.\n\n",
    );
    out.push_str("## Layout\n");
    out.push_str(
        "- **delta.patch** — single unified diff aggregating **all** changes (including added files via `/dev/null -> <path>`).\n",
    );
    out.push_str(
        "- **diffs/** — per-file unified diffs (same content as `delta.patch`, split by file).\n",
    );
    out.push_str("- **added/** — full contents of newly added files (text).\n");
    out.push_str("- **SUMMARY.md** — human summary of Added/Removed/Changed/Renamed/Oversize.\n");
    out.push_str("- **delta.index.json** — machine-readable delta index.\n\n");
    push_conventions(&mut out, opts);
    out.push_str("## Oversize diffs\n");
    out.push_str("For files exceeding internal thresholds, a minimal placeholder hunk is included:\n");
    out.push_str("--- <old>\n+++ <new>\n@@\n# diff omitted (oversize)\n\n");
    out.push_str("No textual ellipses are used.\n\n");
    if opts.include_bench_note {
        push_bench_note(&mut out);
    }
    out.push_str("## How to consume\n");
    out.push_str(
        "- Prefer **delta.patch** for one-pass ingestion; use **diffs/** when you need per-file routing.\n",
    );
    out.push_str(
        "- For added files, **delta.patch** contains `/dev/null -> <path>` hunks; **added/** mirrors the full file body.\n",
    );
    out.push_str(
        "- Line anchors in diffs are **1-based**; consumers must not rely on file ordering.\n",
    );
    finish(out)
}

fn module_name(opts: &ReadmeOptions) -> String {
    let name = opts.module_name.trim();
    if name.is_empty() {
        "sourcepack bundle".into()
    } else {
        name.to_string()
    }
}

fn push_conventions(out: &mut String, opts: &ReadmeOptions) {
    let supported = csv(&opts.supported_langs);
    let present = csv(&opts.present_langs);
    let prefixes = if opts.diff_no_prefix {
        "**omitted**"
    } else {
        "**present**"
    };
    out.push_str("## Conventions\n");
    out.push_str("- Encoding: **UTF-8**; newlines: **\\n** only.\n");
    out.push_str(&format!(
        "- Unified diff context: **{}** lines.\n",
        opts.context_lines
    ));
    out.push_str(&format!(
        "- Git-style prefixes **a/** and **b/** are {prefixes}.\n"
    ));
    out.push_str(&format!("- Supported languages: {supported}.\n"));
    out.push_str(&format!("- Present in this bundle: {present}.\n\n"));
}

fn push_bench_note(out: &mut String) {
    out.push_str("## Benchmarks\n");
    out.push_str(
        "If provided via `--bench <path>`, a plain-text **bench.txt** is included at the bundle root.\n\n",
    );
}

fn csv(items: &[String]) -> String {
    let mut cleaned: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    cleaned.sort_unstable();
    cleaned.join(", ")
}

/// Strip trailing whitespace per line and guarantee a trailing newline.
fn finish(text: String) -> String {
    let mut out = text
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ReadmeOptions {
        ReadmeOptions {
            module_name: "acme".into(),
            supported_langs: vec!["go".into(), "ts".into(), "cs".into()],
            present_langs: vec!["go".into()],
            diff_no_prefix: false,
            context_lines: 4,
            include_bench_note: false,
        }
    }

    #[test]
    fn test_full_readme_is_deterministic_and_terminated() {
        let a = generate_full_readme(&opts());
        let b = generate_full_readme(&opts());
        assert_eq!(a, b);
        assert!(a.ends_with('\n'));
        assert!(a.starts_with("# acme\n"));
        assert!(a.contains("Supported languages: cs, go, ts."));
        assert!(a.contains("Present in this bundle: go."));
    }

    #[test]
    fn test_delta_readme_prefix_note() {
        let mut o = opts();
        o.diff_no_prefix = true;
        let text = generate_delta_readme(&o);
        assert!(text.contains("**a/** and **b/** are **omitted**"));
        assert!(text.contains("# diff omitted (oversize)"));
    }

    #[test]
    fn test_bench_note_toggle() {
        let mut o = opts();
        assert!(!generate_full_readme(&o).contains("bench.txt"));
        o.include_bench_note = true;
        assert!(generate_full_readme(&o).contains("bench.txt"));
    }

    #[test]
    fn test_empty_module_falls_back() {
        let mut o = opts();
        o.module_name = "  ".into();
        assert!(generate_full_readme(&o).starts_with("# sourcepack bundle\n"));
    }
}
