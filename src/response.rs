//! §4.F — the response generator. Normalizes the target, enforces policy
//! (hidden-file rejection, redirect, index/listing, conditional, range), and
//! emits headers + body.
//!
//! Control flow is grounded on `stephank-hyper-staticfile`'s `Static::call`
//! (`other_examples/...static_service.rs.rs`) for the stat → redirect →
//! index → conditional shape; body transmission reuses the teacher's
//! `write_all`-in-a-loop idiom from `send_precompiled_response`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::ResponseFault;
use crate::error_page;
use crate::listing;
use crate::mime;
use crate::path;
use crate::percent;
use crate::request::{Method, Request};
use crate::status::Status;
use crate::timestamp;

const SEND_CHUNK: usize = 8 * 1024;

/// Runs component F against `request` and writes the full response to
/// `stream`. Returns the status for access-log purposes.
pub async fn generate<S>(stream: &mut S, request: &Request, config: &Config) -> Status
where
    S: AsyncWrite + Unpin,
{
    match generate_inner(stream, request, config).await {
        Ok(status) => status,
        Err(fault) => {
            let status = Status::from(&fault);
            error_page::write(stream, status).await
        }
    }
}

async fn generate_inner<S>(
    stream: &mut S,
    request: &Request,
    config: &Config,
) -> Result<Status, ResponseFault>
where
    S: AsyncWrite + Unpin,
{
    // 1. Normalize.
    let mut realtarget = path::normalize(&request.target).ok_or(ResponseFault::BadTarget)?;

    // 2. Hidden-file rejection.
    if realtarget.starts_with('.') || realtarget.contains("/.") {
        return Err(ResponseFault::Hidden);
    }

    // 3. Stat.
    let fs_path = join_root(config, &realtarget);
    let metadata = stat(&fs_path).await?;

    // 4. Directory trailing slash.
    if metadata.is_dir() && !realtarget.ends_with('/') {
        if realtarget.len() + 1 > crate::request::PATH_MAX {
            return Err(ResponseFault::PathOverflow);
        }
        realtarget.push('/');
    }

    // 5. Canonical redirect.
    if realtarget != request.target {
        return Ok(send_redirect(stream, &realtarget).await);
    }

    // 6. Directory content resolution.
    let (file_path, file_meta, logical_path) = if metadata.is_dir() {
        let candidate = format!("{}{}", realtarget, config.docindex);
        if candidate.len() > crate::request::PATH_MAX {
            return Err(ResponseFault::PathOverflow);
        }
        let candidate_fs_path = join_root(config, &candidate);
        match stat(&candidate_fs_path).await {
            Ok(candidate_meta) if candidate_meta.is_file() => {
                (candidate_fs_path, candidate_meta, candidate)
            }
            other => {
                if config.listdirs {
                    return Ok(send_listing(stream, request, &realtarget, &fs_path).await);
                }
                return Err(match other {
                    Err(ResponseFault::StatForbidden) => ResponseFault::StatForbidden,
                    Ok(meta) if !meta.is_file() => ResponseFault::StatForbidden,
                    _ => ResponseFault::StatNotFound,
                });
            }
        }
    } else {
        (fs_path, metadata, realtarget.clone())
    };

    // 7. If-Modified-Since.
    let mtime = file_meta.modified().map_err(|_| ResponseFault::StatNotFound)?;
    if let Some(raw) = &request.fields.if_modified_since {
        let parsed = timestamp::parse(raw).ok_or(ResponseFault::BadIfModifiedSince)?;
        if mtime <= parsed {
            return Ok(send_not_modified(stream, mtime).await);
        }
    }

    // 8. Range.
    let size = file_meta.len();
    let (start, end_exclusive, is_range) = match &request.fields.range {
        Some(raw) => {
            let (s, e) = parse_range(raw, size)?;
            (s, e, true)
        }
        None => (0, size, false),
    };

    // 9. MIME.
    let content_type = mime::resolve(&logical_path, &config.mimes).to_string();

    // 10. Send file.
    send_file(
        stream,
        &file_path,
        request.method,
        mtime,
        &content_type,
        start,
        end_exclusive,
        size,
        is_range,
    )
    .await
}

/// Resolves a normalized, leading-slash request target against the document
/// root. Once `setup::chroot_into` has actually run, `config.servedir` *is*
/// the process's `/` (via `chdir`+`chroot(".")`), so re-prefixing it a
/// second time would build a doubled, nonexistent path like
/// `/srv/www/srv/www/index.html`; `config.chrooted` records whether that
/// syscall sequence ran so the same resolution logic is correct both in the
/// real chrooted binary (resolve relative to cwd) and in tests that build a
/// `Config` directly without chrooting (resolve relative to `servedir`).
fn join_root(config: &Config, realtarget: &str) -> PathBuf {
    let relative = realtarget.trim_start_matches('/');
    if config.chrooted {
        Path::new(".").join(relative)
    } else {
        config.servedir.join(relative)
    }
}

async fn stat(path: &Path) -> Result<std::fs::Metadata, ResponseFault> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(ResponseFault::StatForbidden),
        Err(_) => Err(ResponseFault::StatNotFound),
    }
}

async fn send_redirect<S>(stream: &mut S, realtarget: &str) -> Status
where
    S: AsyncWrite + Unpin,
{
    let location = percent::encode(realtarget);
    let head = format!(
        "HTTP/1.1 301 Moved Permanently\r\nDate: {}\r\nConnection: close\r\nLocation: {}\r\nContent-Length: 0\r\n\r\n",
        timestamp::format(None),
        location,
    );
    if stream.write_all(head.as_bytes()).await.is_err() || stream.flush().await.is_err() {
        return Status::RequestTimeout408;
    }
    Status::MovedPermanently301
}

async fn send_not_modified<S>(stream: &mut S, mtime: std::time::SystemTime) -> Status
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 304 Not Modified\r\nDate: {}\r\nConnection: close\r\nLast-Modified: {}\r\n\r\n",
        timestamp::format(None),
        timestamp::format(Some(mtime)),
    );
    if stream.write_all(head.as_bytes()).await.is_err() || stream.flush().await.is_err() {
        return Status::RequestTimeout408;
    }
    Status::NotModified304
}

async fn send_listing<S>(
    stream: &mut S,
    request: &Request,
    realtarget: &str,
    dir_fs_path: &Path,
) -> Status
where
    S: AsyncWrite + Unpin,
{
    let entries = match listing::list_entries(dir_fs_path).await {
        Ok(entries) => entries,
        Err(_) => return error_page::write(stream, Status::NotFound404).await,
    };
    let body = listing::render(realtarget, &entries);
    let head = format!(
        "HTTP/1.1 200 OK\r\nDate: {}\r\nConnection: close\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
        timestamp::format(None),
        body.len(),
    );
    if stream.write_all(head.as_bytes()).await.is_err() {
        return Status::RequestTimeout408;
    }
    if request.method == Method::Get && stream.write_all(body.as_bytes()).await.is_err() {
        return Status::RequestTimeout408;
    }
    if stream.flush().await.is_err() {
        return Status::RequestTimeout408;
    }
    Status::Ok200
}

/// Parses `Range: bytes=lower-upper` into `[start, end_exclusive)`. An
/// explicit upper bound is inclusive per HTTP semantics and is converted to
/// an exclusive end (`+1`); a missing upper bound defaults to `size`, which
/// is already exclusive. See `DESIGN.md` Open Question 3.
fn parse_range(raw: &str, size: u64) -> Result<(u64, u64), ResponseFault> {
    let spec = raw.strip_prefix("bytes=").ok_or(ResponseFault::BadRange)?;
    let (lower_str, upper_str) = spec.split_once('-').ok_or(ResponseFault::BadRange)?;

    let lower: u64 = if lower_str.is_empty() {
        0
    } else {
        lower_str.parse().map_err(|_| ResponseFault::BadRange)?
    };

    let (end_exclusive, has_explicit_upper) = if upper_str.is_empty() {
        (size, false)
    } else {
        let upper: u64 = upper_str.parse().map_err(|_| ResponseFault::BadRange)?;
        (upper.checked_add(1).ok_or(ResponseFault::BadRange)?, true)
    };

    if lower > end_exclusive || (has_explicit_upper && lower > end_exclusive - 1) {
        return Err(ResponseFault::BadRange);
    }

    let clamped_end = end_exclusive.min(size);
    if lower > clamped_end {
        return Err(ResponseFault::BadRange);
    }

    Ok((lower, clamped_end))
}

#[allow(clippy::too_many_arguments)]
async fn send_file<S>(
    stream: &mut S,
    file_path: &Path,
    method: Method,
    mtime: std::time::SystemTime,
    content_type: &str,
    start: u64,
    end_exclusive: u64,
    size: u64,
    is_range: bool,
) -> Result<Status, ResponseFault>
where
    S: AsyncWrite + Unpin,
{
    let mut file = tokio::fs::File::open(file_path)
        .await
        .map_err(|_| ResponseFault::OpenForbidden)?;
    file.seek(std::io::SeekFrom::Start(start))
        .await
        .map_err(|_| ResponseFault::SeekFailed)?;

    let content_length = end_exclusive - start;
    let status = if is_range {
        Status::PartialContent206
    } else {
        Status::Ok200
    };

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nDate: {}\r\nConnection: close\r\nLast-Modified: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
        status.code(),
        status.reason(),
        timestamp::format(None),
        timestamp::format(Some(mtime)),
        content_type,
        content_length,
    );
    if is_range {
        head.push_str(&format!(
            "Content-Range: bytes {}-{}/{}\r\n",
            start,
            end_exclusive.saturating_sub(1),
            size,
        ));
    }
    head.push_str("\r\n");

    if stream.write_all(head.as_bytes()).await.is_err() {
        return Ok(Status::RequestTimeout408);
    }

    if method == Method::Get {
        let mut remaining = content_length;
        let mut buf = [0u8; SEND_CHUNK];
        while remaining > 0 {
            let want = remaining.min(SEND_CHUNK as u64) as usize;
            let n = match file.read(&mut buf[..want]).await {
                Ok(0) => break,
                Ok(n) => n,
                // Status line + headers (and possibly earlier chunks of the
                // body) are already on the wire at this point, so this must
                // not propagate as an `Err` -- `generate()` would route it
                // through `error_page::write` and emit a second status line
                // and header block onto the same connection. Report the
                // failure status directly instead, matching the write-failure
                // arms above and below.
                Err(_) => return Ok(Status::InternalServerError500),
            };
            if stream.write_all(&buf[..n]).await.is_err() {
                return Ok(Status::RequestTimeout408);
            }
            remaining -= n as u64;
        }
    }

    if stream.flush().await.is_err() {
        return Ok(Status::RequestTimeout408);
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::Config;
    use crate::request::{Fields, Method, Request};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(dir: &std::path::Path) -> Config {
        let cli = Cli::parse_from(["quark", "-d", dir.to_str().unwrap()]);
        Config::from_cli(cli)
    }

    fn request(method: Method, target: &str) -> Request {
        Request {
            method,
            target: target.to_string(),
            fields: Fields::default(),
        }
    }

    #[tokio::test]
    async fn serves_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello").unwrap();
        let config = test_config(dir.path());
        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/hello.txt"), &config).await;
        assert_eq!(status, Status::Ok200);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Content-Length: 5"));
        assert!(text.ends_with("hello"));
    }

    #[tokio::test]
    async fn rejects_dotfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".secret"), b"nope").unwrap();
        let config = test_config(dir.path());
        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/.secret"), &config).await;
        assert_eq!(status, Status::Forbidden403);
    }

    #[tokio::test]
    async fn rejects_dot_segment_after_decode() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut buf = Vec::new();
        let req = request(Method::Get, "/../etc/passwd");
        let status = generate(&mut buf, &req, &config).await;
        // "/../etc/passwd" normalizes to "/etc/passwd", which contains no
        // "/." -- not hidden; it simply won't exist under the served root.
        assert_eq!(status, Status::NotFound404);
        let _ = status;
    }

    #[tokio::test]
    async fn redirects_non_canonical_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/c"), b"hello").unwrap();
        let config = test_config(dir.path());
        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/a//b/../c"), &config).await;
        assert_eq!(status, Status::MovedPermanently301);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Location: /a/c"));
    }

    #[tokio::test]
    async fn head_response_has_empty_body_same_headers_as_get() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"123456789012").unwrap();
        let config = test_config(dir.path());

        let mut get_buf = Vec::new();
        generate(&mut get_buf, &request(Method::Get, "/index.html"), &config).await;
        let mut head_buf = Vec::new();
        generate(&mut head_buf, &request(Method::Head, "/index.html"), &config).await;

        let get_text = String::from_utf8(get_buf).unwrap();
        let head_text = String::from_utf8(head_buf).unwrap();
        let (get_headers, get_body) = get_text.split_once("\r\n\r\n").unwrap();
        let (head_headers, head_body) = head_text.split_once("\r\n\r\n").unwrap();
        assert_eq!(get_headers, head_headers);
        assert_eq!(get_body.len(), 12);
        assert_eq!(head_body.len(), 0);
    }

    #[tokio::test]
    async fn directory_listing_when_no_index_and_listdirs_enabled() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("dirB")).unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();

        let cli = Cli::parse_from(["quark", "-d", dir.path().to_str().unwrap(), "--list-dirs"]);
        let config = Config::from_cli(cli);

        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/"), &config).await;
        assert_eq!(status, Status::Ok200);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("text/html"));
        let dirb = text.find("dirB").unwrap();
        let atxt = text.find("a.txt").unwrap();
        let parent = text.find("..").unwrap();
        assert!(parent < dirb);
        assert!(dirb < atxt);
        assert!(!text.contains(".hidden"));
    }

    #[tokio::test]
    async fn range_request_returns_partial_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file"), b"abcdefgh").unwrap();
        let config = test_config(dir.path());

        let mut req = request(Method::Get, "/file");
        req.fields.range = Some("bytes=2-4".to_string());

        let mut buf = Vec::new();
        let status = generate(&mut buf, &req, &config).await;
        assert_eq!(status, Status::PartialContent206);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Content-Length: 3"));
        assert!(text.contains("Content-Range: bytes 2-4/8"));
        assert!(text.ends_with("cde"));
    }

    #[tokio::test]
    async fn malformed_range_is_bad_request() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file"), b"abcdefgh").unwrap();
        let config = test_config(dir.path());

        let mut req = request(Method::Get, "/file");
        req.fields.range = Some("bytes=5-2".to_string());

        let mut buf = Vec::new();
        let status = generate(&mut buf, &req, &config).await;
        assert_eq!(status, Status::BadRequest400);
    }

    #[tokio::test]
    async fn if_modified_since_future_date_yields_304() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file"), b"abc").unwrap();
        let config = test_config(dir.path());

        let mut req = request(Method::Get, "/file");
        req.fields.if_modified_since = Some(timestamp::format(Some(
            std::time::SystemTime::now() + std::time::Duration::from_secs(3600),
        )));

        let mut buf = Vec::new();
        let status = generate(&mut buf, &req, &config).await;
        assert_eq!(status, Status::NotModified304);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("304 Not Modified"));
        assert!(text.trim_end().ends_with("\r\n\r\n".trim_end()));
    }

    #[tokio::test]
    async fn directory_index_resolves_mime_from_index_filename() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        let config = test_config(dir.path());

        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/"), &config).await;
        assert_eq!(status, Status::Ok200);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut buf = Vec::new();
        let status = generate(&mut buf, &request(Method::Get, "/nope.txt"), &config).await;
        assert_eq!(status, Status::NotFound404);
    }
}
