//! Snapshot and on-disk cache utilities for the incremental (delta)
//! workflow.
//!
//! Layout per project: `<baseTmp>/<pathKey>/index.json` for the snapshot
//! and `<baseTmp>/<pathKey>/blobs/aa/bb/<sha256>` for optional
//! content-addressed blobs. All writes publish atomically (temp file +
//! fsync + rename) so readers never observe partial files; blob writes are
//! idempotent write-once.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hashing::{is_lower_hex, sha256_hex};

const INDEX_FILE_NAME: &str = "index.json";
const BLOBS_DIR_NAME: &str = "blobs";

/// A single file entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapFile {
    /// Repo-relative path.
    pub path: String,
    /// Lowercase hex content hash.
    pub hash: String,
    /// Total line count.
    pub lines: usize,
}

/// The recorded state of a project at a specific moment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub module: String,
    /// RFC-3339 UTC timestamp.
    #[serde(default)]
    pub created: String,
    #[serde(default, rename = "formatVersion", skip_serializing_if = "String::is_empty")]
    pub format_version: String,
    #[serde(default)]
    pub files: Vec<SnapFile>,
}

/// Short, stable identifier for an absolute project path: the first 12 hex
/// chars of sha256(absPath).
pub fn path_key(abs: &Path) -> String {
    sha256_hex(abs.to_string_lossy().as_bytes())[..12].to_string()
}

/// Cache directory for the given absolute source path.
pub fn cache_dir(base_tmp: &Path, src_abs: &Path) -> PathBuf {
    base_tmp.join(path_key(src_abs))
}

/// Read the snapshot from `<dir>/index.json`. A missing file is reported
/// as `Ok(None)` so callers can treat it as "no previous snapshot".
pub fn load(dir: &Path) -> Result<Option<Snapshot>> {
    let path = dir.join(INDEX_FILE_NAME);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&data)?))
}

/// Write the snapshot atomically to `<dir>/index.json`.
pub fn save(dir: &Path, snap: &Snapshot) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-index.json-")
        .tempfile_in(dir)?;
    let body = serde_json::to_vec_pretty(snap)?;
    tmp.write_all(&body)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(INDEX_FILE_NAME))
        .map_err(|e| e.error)?;
    Ok(())
}

/// Remove the entire cache directory for the project. Safe to call when it
/// does not exist.
pub fn clear(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Store content-addressed data under `<dir>/blobs/aa/bb/<hash>`. A blob
/// that already exists is left untouched.
pub fn save_blob(dir: &Path, hash: &str, data: &[u8]) -> Result<()> {
    let path = blob_path(dir, hash)?;
    if path.exists() {
        return Ok(());
    }
    let parent = path.parent().expect("blob path has a parent");
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".tmp-{hash}-"))
        .tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| e.error)?;
    Ok(())
}

/// Load a blob by content hash.
pub fn read_blob(dir: &Path, hash: &str) -> Result<Vec<u8>> {
    Ok(fs::read(blob_path(dir, hash)?)?)
}

/// Whether a content-addressed blob exists.
pub fn has_blob(dir: &Path, hash: &str) -> bool {
    blob_path(dir, hash).map(|p| p.exists()).unwrap_or(false)
}

/// Canonical blob path: the first four hex chars form a two-level shard.
/// Hashes must be lowercase hex, at least 6 chars.
fn blob_path(dir: &Path, hash: &str) -> io::Result<PathBuf> {
    if !is_lower_hex(hash) || hash.len() < 6 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid hash for blob storage",
        ));
    }
    Ok(dir
        .join(BLOBS_DIR_NAME)
        .join(&hash[..2])
        .join(&hash[2..4])
        .join(hash))
}
