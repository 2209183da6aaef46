//! Static file resolution under the project root.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// File served for directory requests.
pub const INDEX_FILE: &str = "index.html";

/// Maps a request path to a readable file under `root`.
///
/// Returns `None` when the path does not decode, tries to climb out of the
/// root (through `..` or a symlink), or names nothing servable.
/// Directories resolve to their `index.html`.
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;

    let mut candidate = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => candidate.push(s),
        }
    }

    let root = root.canonicalize().ok()?;
    let mut resolved = candidate.canonicalize().ok()?;
    if !resolved.starts_with(&root) {
        return None;
    }

    if resolved.is_dir() {
        resolved.push(INDEX_FILE);
    }
    resolved.is_file().then_some(resolved)
}

/// Guesses a content type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
