//! Text normalization helpers shared by the indexer and the archive writers.
//!
//! All bundle text output is UTF-8 with LF line endings and a guaranteed
//! trailing newline. These helpers centralize that contract.

/// Convert CRLF and bare CR to LF and replace invalid UTF-8 sequences with
/// U+FFFD.
pub fn normalize_utf8_lf(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let text = text.replace("\r\n", "\n");
    text.replace('\r', "\n")
}

/// Append a single `\n` if the text is non-empty and does not already end
/// with one.
pub fn ensure_trailing_lf(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Concatenate chunks, inserting exactly one `\n` between chunks when the
/// previous chunk does not end with one.
pub fn join_with_single_nl<S: AsRef<str>>(chunks: &[S]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(chunk.as_ref());
    }
    out
}

/// Total line count of a file body: 1 plus the number of `\n` bytes.
pub fn count_lines(data: &[u8]) -> usize {
    1 + data.iter().filter(|&&b| b == b'\n').count()
}

/// 1-based line number of the byte offset `off` within `text`.
pub fn line_of(text: &str, off: usize) -> usize {
    1 + text.as_bytes()[..off].iter().filter(|&&b| b == b'\n').count()
}
