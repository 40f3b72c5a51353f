//! §4.D — MIME resolver: last-dot suffix, exact case-sensitive match against
//! an ordered `(ext, content_type)` table, default `application/octet-stream`.
//!
//! The default table keeps the teacher's `MimeType` string literals
//! (`src/lib.rs` original), but the lookup itself is rewritten as a linear
//! scan over a configurable, ordered slice rather than a fixed enum, since
//! `spec.md` §3 makes `mimes` a `Configuration` field, not a compile-time set.

use once_cell::sync::Lazy;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// The built-in table used when no configuration overrides are supplied.
/// Order matters only in that earlier entries win on duplicate extensions;
/// this table has no duplicates.
pub static DEFAULT_TABLE: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    [
        ("html", "text/html; charset=utf-8"),
        ("htm", "text/html; charset=utf-8"),
        ("css", "text/css; charset=utf-8"),
        ("js", "text/javascript; charset=utf-8"),
        ("json", "application/json; charset=utf-8"),
        ("xml", "application/xml; charset=utf-8"),
        ("txt", "text/plain; charset=utf-8"),
        ("ico", "image/x-icon"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("pdf", "application/pdf"),
        ("woff", "font/woff"),
        ("woff2", "font/woff2"),
        ("ttf", "font/ttf"),
        ("eot", "application/vnd.ms-fontobject"),
    ]
    .iter()
    .map(|(ext, ct)| (ext.to_string(), ct.to_string()))
    .collect()
});

/// Resolves the content type for `path` by finding the suffix after the last
/// `.` in the final path component and comparing it, case-sensitively and
/// exactly, against `table`. No dot (or no match) yields `OCTET_STREAM`.
pub fn resolve<'a>(path: &str, table: &'a [(String, String)]) -> &'a str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some(dot) = file_name.rfind('.') else {
        return OCTET_STREAM;
    };
    let suffix = &file_name[dot + 1..];
    table
        .iter()
        .find(|(ext, _)| ext == suffix)
        .map(|(_, ct)| ct.as_str())
        .unwrap_or(OCTET_STREAM)
}
