//! CHAT bundle writer.
//!
//! Files are ranked (graph degree for TS/JS nodes, then has-exports, then
//! non-test paths, then path) and packed into consecutive `chat/NNNN.md`
//! messages of at most `max_classes` files and roughly `max_chars`
//! characters each. Each file renders as a header block plus a fenced code
//! block; when the budget runs out mid-file the fence is still closed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{create_archive, sanitize_path, write_raw};
use crate::error::Result;
use crate::graph::Graph;
use crate::index::{ManFile, Manifest, Symbols};
use crate::lang::fence_tag;
use crate::textutil::{ensure_trailing_lf, normalize_utf8_lf};
use crate::walk::extension_of;

/// Options for the CHAT layout.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Max files per message. Values < 1 fall back to 10.
    pub max_classes: usize,
    /// Character budget per message. Values < 1 fall back to 80_000.
    pub max_chars: usize,
    pub bench_path: Option<PathBuf>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_classes: 10,
            max_chars: 80_000,
            bench_path: None,
        }
    }
}

struct MessageMeta {
    name: String,
    files: Vec<String>,
}

/// Write the CHAT bundle archive. `files` maps the manifest's relative
/// paths to absolute paths for content streaming.
pub fn write_chat(
    zip_path: &Path,
    man: &Manifest,
    files: &[(String, PathBuf)],
    syms: &Symbols,
    graph: &Graph,
    opts: &ChatOptions,
) -> Result<()> {
    let max_classes = if opts.max_classes < 1 { 10 } else { opts.max_classes };
    let max_chars = if opts.max_chars < 1 { 80_000 } else { opts.max_chars };

    let mut zw = create_archive(zip_path)?;

    let order = rank_chat_order(man, graph);
    let abs_of: HashMap<&str, &PathBuf> =
        files.iter().map(|(rel, abs)| (rel.as_str(), abs)).collect();

    let mut metas: Vec<MessageMeta> = Vec::new();
    let mut i = 0usize;
    let mut msg_idx = 0usize;
    while i < order.len() {
        msg_idx += 1;
        let name = format!("chat/{msg_idx:04}.md");
        let mut body = String::new();
        let mut meta = MessageMeta {
            name: name.clone(),
            files: Vec::new(),
        };

        let mut classes = 0usize;
        while classes < max_classes && i < order.len() {
            let mf = &order[i];
            i += 1;
            classes += 1;
            meta.files.push(mf.path.clone());

            let abs = abs_of.get(mf.path.as_str()).map(|p| p.as_path());
            let exhausted = append_chat_entry(&mut body, mf, abs, max_chars);
            if exhausted {
                break;
            }
        }

        write_raw(&mut zw, &sanitize_path(&name), body.as_bytes())?;
        metas.push(meta);
    }

    let toc = ensure_trailing_lf(render_chat_toc(&metas));
    write_raw(&mut zw, "TOC.md", toc.as_bytes())?;

    let readme = ensure_trailing_lf(render_chat_readme(
        man,
        syms,
        metas.len(),
        max_classes,
        max_chars,
    ));
    write_raw(&mut zw, "README.md", readme.as_bytes())?;

    if let Some(bench) = &opts.bench_path {
        write_raw(&mut zw, "bench.txt", &fs::read(bench)?)?;
    }

    zw.finish()?;
    Ok(())
}

/// Rank files for packing: graph degree of the file's TS/JS node
/// (descending, 0 for non-JS files), then has-exports, then non-test
/// paths, then path ascending.
fn rank_chat_order(man: &Manifest, graph: &Graph) -> Vec<ManFile> {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for f in &man.files {
        let ext = extension_of(&f.path);
        if matches!(ext.as_str(), ".ts" | ".tsx" | ".js" | ".jsx" | ".mjs" | ".cjs") {
            let no_ext = match f.path.rfind('.') {
                Some(idx) => &f.path[..idx],
                None => f.path.as_str(),
            };
            let node = format!("js:{no_ext}");
            let count = graph
                .edges
                .iter()
                .filter(|(from, to)| *from == node || *to == node)
                .count();
            degree.insert(f.path.as_str(), count);
        }
    }

    let mut order = man.files.clone();
    order.sort_by(|a, b| {
        let da = degree.get(a.path.as_str()).copied().unwrap_or(0);
        let db = degree.get(b.path.as_str()).copied().unwrap_or(0);
        db.cmp(&da)
            .then_with(|| a.exports.is_empty().cmp(&b.exports.is_empty()))
            .then_with(|| is_test_path(&a.path).cmp(&is_test_path(&b.path)))
            .then_with(|| a.path.cmp(&b.path))
    });
    order
}

/// Whether a path belongs to a tests folder or is a Go test file.
fn is_test_path(p: &str) -> bool {
    let p = p.replace('\\', "/");
    p.contains("/test/") || p.ends_with("_test.go")
}

/// Append one file's header and fenced content to the message body,
/// bounded by `max_chars`. Returns true when the budget is exhausted.
fn append_chat_entry(body: &mut String, mf: &ManFile, abs: Option<&Path>, max_chars: usize) -> bool {
    push_bounded(body, &render_header(mf), max_chars);
    let fence = format!("```{}\n", fence_tag(&extension_of(&mf.path)));
    push_bounded(body, &fence, max_chars);

    if let Some(abs) = abs {
        if let Ok(data) = fs::read(abs) {
            let content = normalize_utf8_lf(&data);
            push_bounded(body, &content, max_chars);
        }
    }

    // The closing fence is always written, past the budget if necessary.
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str("```\n\n");
    body.len() >= max_chars
}

/// Append at most the remaining budget, cut at a char boundary.
fn push_bounded(body: &mut String, text: &str, max_chars: usize) {
    let remain = max_chars.saturating_sub(body.len());
    if remain == 0 {
        return;
    }
    if text.len() <= remain {
        body.push_str(text);
        return;
    }
    let mut cut = remain;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    body.push_str(&text[..cut]);
}

fn render_header(mf: &ManFile) -> String {
    let mut out = format!("# {}\n", mf.path);
    if !mf.package.is_empty() || !mf.class.is_empty() {
        out.push_str(&format!(
            "- Package: {}\n",
            if mf.package.is_empty() { "-" } else { &mf.package }
        ));
        out.push_str(&format!(
            "- Class: {}\n",
            if mf.class.is_empty() { "-" } else { &mf.class }
        ));
    }
    if !mf.exports.is_empty() {
        out.push_str(&format!("- Exports: {}\n", mf.exports.join(", ")));
    }
    out.push('\n');
    out
}

fn render_chat_toc(metas: &[MessageMeta]) -> String {
    let mut out = String::from("# CHAT TOC\n\n| Message | Files |\n|:--------|:------|\n");
    for meta in metas {
        let files = if meta.files.is_empty() {
            "-".to_string()
        } else {
            meta.files.join(", ")
        };
        out.push_str(&format!("| {} | {} |\n", meta.name, files));
    }
    out
}

fn render_chat_readme(
    man: &Manifest,
    syms: &Symbols,
    messages: usize,
    max_classes: usize,
    max_chars: usize,
) -> String {
    let mut out = String::from("# Chat Bundle\n\n");
    out.push_str(&format!("- Module: {}\n", man.module.trim()));
    out.push_str(&format!("- Files indexed: {}\n", man.files.len()));
    out.push_str(&format!("- Symbols extracted: {}\n", syms.symbols.len()));
    out.push_str(&format!(
        "- Messages: {messages} (up to {max_classes} files per message, {max_chars} chars each)\n\n",
    ));
    out.push_str("Messages are sorted by heuristics (graph degree, exports, tests, path).\n");
    out.push_str("Each message contains one or more files rendered inside fenced code blocks.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn man_file(path: &str, exports: Vec<&str>) -> ManFile {
        ManFile {
            path: path.into(),
            exports: exports.into_iter().map(String::from).collect(),
            lines: 1,
            ..ManFile::default()
        }
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        body
    }

    #[test]
    fn test_rank_prefers_connected_then_exports_then_non_tests() {
        let man = Manifest {
            module: "m".into(),
            files: vec![
                man_file("z/test/helper.go", vec![]),
                man_file("plain.go", vec![]),
                man_file("api.go", vec!["Serve()"]),
                man_file("hub.ts", vec![]),
            ],
            ..Manifest::default()
        };
        let graph = Graph {
            nodes: vec!["js:hub".into(), "js:other".into()],
            edges: vec![("js:other".into(), "js:hub".into())],
        };
        let order: Vec<_> = rank_chat_order(&man, &graph)
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(order, vec!["hub.ts", "api.go", "plain.go", "z/test/helper.go"]);
    }

    #[test]
    fn test_is_test_path() {
        assert!(is_test_path("pkg/test/util.ts"));
        assert!(is_test_path("x_test.go"));
        assert!(!is_test_path("src/testing.go"));
    }

    #[test]
    fn test_messages_partition_by_max_classes() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        let mut man_files = Vec::new();
        for name in ["a.go", "b.go", "c.go"] {
            fs::write(dir.path().join(name), format!("package {name}\n")).unwrap();
            files.push((name.to_string(), dir.path().join(name)));
            man_files.push(man_file(name, vec![]));
        }
        let man = Manifest {
            module: "m".into(),
            files: man_files,
            ..Manifest::default()
        };
        let out = dir.path().join("chat.zip");
        let opts = ChatOptions {
            max_classes: 2,
            ..ChatOptions::default()
        };
        write_chat(&out, &man, &files, &Symbols::default(), &Graph::default(), &opts).unwrap();

        let first = read_entry(&out, "chat/0001.md");
        assert!(first.contains("# a.go"));
        assert!(first.contains("# b.go"));
        assert!(!first.contains("# c.go"));
        let second = read_entry(&out, "chat/0002.md");
        assert!(second.contains("# c.go"));

        let toc = read_entry(&out, "TOC.md");
        assert!(toc.contains("| chat/0001.md | a.go, b.go |"));
        assert!(toc.contains("| chat/0002.md | c.go |"));
    }

    #[test]
    fn test_budget_exhaustion_still_closes_fence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.go"), "x\n".repeat(4000)).unwrap();
        fs::write(dir.path().join("next.go"), "package next\n").unwrap();
        let files = vec![
            ("big.go".to_string(), dir.path().join("big.go")),
            ("next.go".to_string(), dir.path().join("next.go")),
        ];
        let man = Manifest {
            module: "m".into(),
            files: vec![man_file("big.go", vec![]), man_file("next.go", vec![])],
            ..Manifest::default()
        };
        let out = dir.path().join("chat.zip");
        let opts = ChatOptions {
            max_classes: 10,
            max_chars: 500,
            ..ChatOptions::default()
        };
        write_chat(&out, &man, &files, &Symbols::default(), &Graph::default(), &opts).unwrap();

        let first = read_entry(&out, "chat/0001.md");
        assert!(first.contains("# big.go"));
        assert!(first.trim_end().ends_with("```"));
        // The second file starts a fresh message.
        let second = read_entry(&out, "chat/0002.md");
        assert!(second.contains("# next.go"));
    }

    #[test]
    fn test_fence_tags_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const x = 1;\n").unwrap();
        let files = vec![("a.ts".to_string(), dir.path().join("a.ts"))];
        let man = Manifest {
            module: "m".into(),
            files: vec![man_file("a.ts", vec![])],
            ..Manifest::default()
        };
        let out = dir.path().join("chat.zip");
        write_chat(
            &out,
            &man,
            &files,
            &Symbols::default(),
            &Graph::default(),
            &ChatOptions::default(),
        )
        .unwrap();
        let body = read_entry(&out, "chat/0001.md");
        assert!(body.contains("```ts\n"));
    }
}
