//! Core indexing data types and the per-file/whole-tree artifact builders:
//! region anchors, symbols, slices, jump pointers and the manifest.

pub mod anchors;
pub mod autoanchors;
pub mod manifest;
pub mod pointers;
pub mod slices;

use serde::{Deserialize, Serialize};

pub use anchors::extract_anchors;
pub use autoanchors::{build_auto_anchors, AutoAnchorConfig};
pub use manifest::{build_artifacts, compute_bundle_id, IndexOptions};
pub use pointers::{build_anchor_pointers, build_symbol_pointers};
pub use slices::build_slices;

/// A named region in a source file. Line numbers are 1-based and inclusive
/// on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// A single source file in the manifest: basic code intelligence (exports,
/// anchors) plus integrity metadata (hash, lines).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManFile {
    /// Project-relative path with '/'.
    pub path: String,
    /// Language package/namespace, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    /// Primary type (e.g. Java class name).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,
    /// "class" | "interface" | "enum" | "struct" | "object" | "file".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Quick API surface, e.g. `["start()", ...]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
    #[serde(default, rename = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Lowercase hex sha256 of the contents.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub lines: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<Anchor>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Top-level index of a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub module: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jdk: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoints: Vec<String>,
    #[serde(default, rename = "sourceGlobs", skip_serializing_if = "Vec::is_empty")]
    pub source_globs: Vec<String>,
    pub files: Vec<ManFile>,
    /// Canonical bundle hash: SHA-256 over sorted "path:hash\n" lines.
    #[serde(default, rename = "bundle_id", skip_serializing_if = "String::is_empty")]
    pub bundle_id: String,
}

/// A discovered code symbol. `qname` is fully qualified
/// ("org.acme.Server.start"). End is finalized by the caller, usually set
/// to the next symbol's start minus one, or the file end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    #[serde(rename = "symbol")]
    pub qname: String,
    /// "method" | "func" | "ctor" | ...
    pub kind: String,
    pub path: String,
    pub start: usize,
    pub end: usize,
}

/// Versioned wrapper for the flat symbol list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Symbols {
    pub version: u32,
    pub symbols: Vec<Symbol>,
}

/// A coarse navigable range within a file. Anchor-derived slices carry the
/// anchor name; chunked slices are named `chunk_<start>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub path: String,
    #[serde(rename = "slice")]
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

/// A jump target. Symbol-backed pointers set `sym`; anchor-backed pointers
/// encode file + slug in the id and leave `sym` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sym: String,
    pub start: usize,
    pub end: usize,
}

/// The primary indexing outputs alongside the import graph.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub manifest: Manifest,
    pub symbols: Symbols,
    pub slices: Vec<Slice>,
    pub pointers: Vec<Pointer>,
    pub graph: crate::graph::Graph,
}
