//! Reproducible archive assembly for FULL, DELTA and CHAT bundles.
//!
//! Every entry written through this module gets the same reproducibility
//! contract: fixed modification time (the ZIP epoch, 1980-01-01), mode
//! 0644, Deflate compression, a sanitized forward-slash name, and an order
//! chosen by the assembler rather than the caller. JSON entries use
//! two-space indentation and a trailing newline.

pub mod chat;
pub mod delta;
pub mod full;
pub mod readme;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Entry options shared by every archive entry: ZIP-epoch timestamp, mode
/// 0644, Deflate.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(zip::DateTime::default())
}

/// Create the output archive, ensuring the parent directory exists.
pub(crate) fn create_archive(zip_path: &Path) -> Result<ZipWriter<File>> {
    if let Some(parent) = zip_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(ZipWriter::new(File::create(zip_path)?))
}

/// Write a JSON entry with two-space indentation and a trailing newline.
pub(crate) fn write_json<T: Serialize>(
    zw: &mut ZipWriter<File>,
    name: &str,
    value: &T,
) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    write_raw(zw, name, &body)
}

/// Write one JSON object per line, each terminated by `\n`.
pub(crate) fn write_jsonl<T: Serialize>(
    zw: &mut ZipWriter<File>,
    name: &str,
    items: &[T],
) -> Result<()> {
    let mut body = Vec::new();
    for item in items {
        body.extend_from_slice(&serde_json::to_vec(item)?);
        body.push(b'\n');
    }
    write_raw(zw, name, &body)
}

/// Write a raw entry under the sanitized name.
pub(crate) fn write_raw(zw: &mut ZipWriter<File>, name: &str, data: &[u8]) -> Result<()> {
    zw.start_file(sanitize_path(name), entry_options())?;
    zw.write_all(data)?;
    Ok(())
}

/// Normalize an archive entry path: forward slashes, no drive prefix, no
/// leading slash, `.`/`..` segments resolved against an empty stack (a
/// `..` pops when possible and never escapes the root). An empty result
/// becomes "entry".
pub fn sanitize_path(p: &str) -> String {
    let mut s = p.replace('\\', "/");
    if s.len() > 1 && s.as_bytes()[1] == b':' {
        s = s[2..].to_string();
    }
    let s = s.trim_start_matches('/');
    let mut stack: Vec<&str> = Vec::new();
    for part in s.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    let joined = stack.join("/");
    if joined.is_empty() {
        "entry".into()
    } else {
        joined
    }
}

/// Return `name` unchanged when free, otherwise append `-1`, `-2`, ...
/// before the last extension until a free name is found. Mutates `used`.
pub fn ensure_unique_name(name: &str, used: &mut BTreeSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let (base, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    };
    for n in 1.. {
        let alt = format!("{base}-{n}{ext}");
        if used.insert(alt.clone()) {
            return alt;
        }
    }
    unreachable!()
}
