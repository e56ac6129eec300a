//! CLI argument definitions using clap.
//!
//! One command, three mutually exclusive output modes (`--zip`, `--delta`,
//! `--chat`). Argument errors exit with code 2 (clap's default for usage
//! errors), runtime errors with 1.

use clap::{ArgAction, ArgGroup, Parser};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::lang::normalize_lang_hint;

/// Deterministic FULL / DELTA / CHAT code bundles for language models.
#[derive(Parser, Debug)]
#[command(name = "sourcepack")]
#[command(about = "Produce reproducible code bundles (FULL, DELTA or CHAT) from a source tree")]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true).args(["zip", "delta", "chat"])))]
pub struct Cli {
    /// Source directory to scan
    #[arg(value_name = "SRC_DIR")]
    pub src_dir: PathBuf,

    /// Write a FULL bundle zip to this path
    #[arg(long, value_name = "OUT")]
    pub zip: Option<PathBuf>,

    /// Write a DELTA bundle zip to this path
    #[arg(long, value_name = "OUT")]
    pub delta: Option<PathBuf>,

    /// Write a CHAT bundle zip to this path
    #[arg(long, value_name = "OUT")]
    pub chat: Option<PathBuf>,

    // ---- Selection & walking ----
    /// Comma-separated extensions to include
    #[arg(
        long,
        value_name = "LIST",
        default_value = ".go,.java,.kt,.cs,.ts,.tsx,.js,.json,.yaml,.yml,.xml,.proto,.gradle,.md,.txt"
    )]
    pub ext: String,

    /// Comma-separated dir/file base-name prefixes to exclude
    #[arg(
        long,
        value_name = "LIST",
        default_value = ".git,node_modules,dist,build,out,target,.idea,.vscode,.DS_Store"
    )]
    pub exclude: String,

    /// Comma-separated substrings that force-include a path
    #[arg(long, value_name = "LIST", default_value = "")]
    pub include: String,

    /// Approx max total bytes to include in FULL mode (0 = no limit)
    #[arg(long, value_name = "N", default_value_t = 25_000_000)]
    pub max_bytes: u64,

    /// Max bytes per file to include (0 = no limit)
    #[arg(long, value_name = "N", default_value_t = 2_000_000)]
    pub max_file_bytes: u64,

    /// Honor .gitignore patterns during the file walk
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub use_gitignore: bool,

    /// Follow symlinks during the walk
    #[arg(long)]
    pub follow_symlinks: bool,

    // ---- Cache & diffs ----
    /// Base cache directory for snapshots and blobs
    #[arg(long, value_name = "DIR", default_value = "tmp/.ccache")]
    pub tmp_dir: PathBuf,

    /// Reset the cache for this source dir before building
    #[arg(long)]
    pub new: bool,

    /// Store source copies as content-addressed blobs for diffs
    #[arg(long)]
    pub store_blobs: bool,

    /// Max bytes for diffs in --delta (0 = no limit)
    #[arg(long, value_name = "N", default_value_t = 2_000_000)]
    pub max_diff_bytes: usize,

    /// Unified diff context lines
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub diff_context: usize,

    /// Omit a/ and b/ prefixes from diff headers
    #[arg(long)]
    pub diff_no_prefix: bool,

    /// Enable similarity-based rename detection in --delta
    #[arg(long)]
    pub rename_similarity: bool,

    /// Max SimHash Hamming distance to classify as a rename
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub rename_sim_thresh: u32,

    /// Old snapshot root for reading removed files in the similarity pass
    #[arg(long, value_name = "DIR")]
    pub rename_sim_oldroot: Option<PathBuf>,

    // ---- Indexing & output ----
    /// Include source copies in the FULL zip under src/
    #[arg(long)]
    pub emit_src: bool,

    /// Max lines per file before slicing; anchors preferred
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub max_file_lines: usize,

    /// Limit symbol extraction to languages (comma list: java,go,ts,kt,cs,py,cpp)
    #[arg(long, value_name = "LIST", default_value = "")]
    pub lang: String,

    /// Validate manifest/symbols before writing the FULL bundle
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub validate: bool,

    /// Save a snapshot in the cache after a FULL build
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub save_snapshot: bool,

    /// Plain-text benchmark file to include as bench.txt
    #[arg(long, value_name = "PATH")]
    pub bench: Option<PathBuf>,

    // ---- Chat ----
    /// Max classes/entities per chat message
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub chat_max_classes: usize,

    /// Max characters per chat message
    #[arg(long, value_name = "N", default_value_t = 80_000)]
    pub chat_max_chars: usize,

    // ---- Auto-anchors ----
    /// Synthesize virtual anchors from symbols/imports/tests
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub auto_anchors: bool,

    /// Minimum region length for auto anchors
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub auto_anchors_min_lines: usize,

    /// Maximum number of auto anchors per file (0 = unlimited)
    #[arg(long, value_name = "N", default_value_t = 64)]
    pub auto_anchors_max_per_file: usize,

    /// Add an IMPORTS anchor if an import block exists
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub auto_anchors_imports: bool,

    /// Add test anchors (Go: Test*/Benchmark*/Example*, TS: describe/it/test)
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub auto_anchors_tests: bool,

    /// Prefix for auto anchor names
    #[arg(long, value_name = "PREFIX", default_value = "auto:")]
    pub auto_anchors_prefix: String,
}

/// The selected output mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Full(PathBuf),
    Delta(PathBuf),
    Chat(PathBuf),
}

impl Cli {
    /// The output mode; exactly one is guaranteed by the arg group.
    pub fn mode(&self) -> Mode {
        if let Some(out) = &self.zip {
            Mode::Full(out.clone())
        } else if let Some(out) = &self.delta {
            Mode::Delta(out.clone())
        } else {
            Mode::Chat(self.chat.clone().expect("mode group guarantees one mode"))
        }
    }

    /// Extension set from `--ext`.
    pub fn ext_set(&self) -> BTreeSet<String> {
        split_csv(&self.ext).into_iter().collect()
    }

    /// Exclusion set from `--exclude`.
    pub fn exclude_set(&self) -> BTreeSet<String> {
        split_csv(&self.exclude).into_iter().collect()
    }

    /// Force-include substrings from `--include`.
    pub fn include_list(&self) -> Vec<String> {
        split_csv(&self.include)
    }

    /// Normalized language hints from `--lang`.
    pub fn lang_hints(&self) -> BTreeSet<String> {
        split_csv(&self.lang)
            .iter()
            .map(|h| normalize_lang_hint(h))
            .filter(|h| !h.is_empty())
            .collect()
    }
}

/// Split a comma-separated list, dropping empty items.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
