//! §4.E — the request parser. Reads one request into a bounded buffer and
//! parses the request line plus the recognized header fields
//! `{Range, If-Modified-Since}`.
//!
//! Adapts the teacher's byte-level header helpers (`trim_header_line`,
//! `header_starts_with`, `read_line_bytes` in the original `src/main.rs`) to
//! the spec's single-buffer-then-split model, which is a better fit for the
//! strict `HEADER_MAX`/`PATH_MAX`/`FIELD_MAX` bounds `spec.md` §3 requires.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ParseFault;
use crate::percent;

/// Example size from `spec.md` §3: request target, including terminator.
pub const PATH_MAX: usize = 4096;
/// Example size from `spec.md` §4.E: bounded header-read buffer.
pub const HEADER_MAX: usize = 4096;
/// Example size from `spec.md` §3: a single recognized field value.
pub const FIELD_MAX: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
        }
    }
}

/// The fixed mapping over the recognized header-field set. `None` means
/// "absent" (the spec's empty-string sentinel, represented idiomatically).
#[derive(Clone, Debug, Default)]
pub struct Fields {
    pub range: Option<String>,
    pub if_modified_since: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub fields: Fields,
}

/// Reads and parses one request from `stream`. Does not apply a timeout
/// itself beyond treating an I/O error as `ParseFault::Timeout` per
/// `spec.md` §4.E ("Read failure ⇒ 408"); the connection-wide 30s deadline
/// is the caller's responsibility (component H, `worker.rs`).
pub async fn parse<S>(stream: &mut S) -> Result<Request, ParseFault>
where
    S: AsyncRead + Unpin,
{
    let buffer = read_until_headers_complete(stream).await?;
    let mut lines = buffer.split(|&b| b == b'\n').map(strip_trailing_cr);

    let request_line = lines.next().ok_or(ParseFault::BadRequestLine)?;
    let (method, target_bytes, version) = parse_request_line(request_line)?;

    if target_bytes.len() > PATH_MAX {
        return Err(ParseFault::TargetTooLarge);
    }
    let _ = version; // already validated in parse_request_line

    let target_raw =
        std::str::from_utf8(target_bytes).map_err(|_| ParseFault::BadRequestLine)?;
    let target = percent::decode(target_raw);
    if target.contains('\0') {
        return Err(ParseFault::BadRequestLine);
    }

    let mut fields = Fields::default();
    for line in lines {
        if line.is_empty() {
            break;
        }
        parse_header_line(line, &mut fields)?;
    }

    Ok(Request {
        method,
        target,
        fields,
    })
}

async fn read_until_headers_complete<S>(stream: &mut S) -> Result<Vec<u8>, ParseFault>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(512);
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
            buffer.truncate(pos + 2);
            return Ok(buffer);
        }
        if buffer.len() >= HEADER_MAX {
            return Err(ParseFault::BufferFull);
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|_| ParseFault::Timeout)?;
        if n == 0 {
            return Err(ParseFault::Eof);
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn strip_trailing_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_request_line(line: &[u8]) -> Result<(Method, &[u8], &'static str), ParseFault> {
    let (method, rest) = if let Some(rest) = line.strip_prefix(b"HEAD") {
        (Method::Head, rest)
    } else if let Some(rest) = line.strip_prefix(b"GET") {
        (Method::Get, rest)
    } else {
        return Err(ParseFault::UnknownMethod);
    };

    let rest = rest.strip_prefix(b" ").ok_or(ParseFault::BadRequestLine)?;

    let sp = rest
        .iter()
        .position(|&b| b == b' ')
        .ok_or(ParseFault::BadRequestLine)?;
    let target = &rest[..sp];
    if target.is_empty() {
        return Err(ParseFault::BadRequestLine);
    }
    let version_bytes = &rest[sp + 1..];

    let version = match version_bytes {
        b"HTTP/1.0" => "HTTP/1.0",
        b"HTTP/1.1" => "HTTP/1.1",
        other if other.starts_with(b"HTTP/") => return Err(ParseFault::UnsupportedVersion),
        _ => return Err(ParseFault::BadRequestLine),
    };

    Ok((method, target, version))
}

// Longest-match-first order, so a future field name that happens to prefix
// another can't shadow it; kept pre-sorted rather than sorted per call since
// the set only changes at compile time.
const RECOGNIZED_FIELDS: &[&str] = &["If-Modified-Since", "Range"];

fn parse_header_line(line: &[u8], fields: &mut Fields) -> Result<(), ParseFault> {
    let line_str = match std::str::from_utf8(line) {
        Ok(s) => s,
        Err(_) => return Ok(()), // not a recognized field; ignored per spec
    };

    let matched = RECOGNIZED_FIELDS
        .iter()
        .copied()
        .find(|name| line_str.as_bytes().starts_with(name.as_bytes()));

    let Some(name) = matched else {
        return Ok(());
    };

    let rest = &line_str[name.len()..];
    let rest = rest.strip_prefix(':').ok_or(ParseFault::BadHeaderLine)?;
    let value = rest.trim_start_matches(' ');

    if value.len() > FIELD_MAX {
        return Err(ParseFault::FieldTooLarge);
    }

    match name {
        "Range" => fields.range = Some(value.to_string()),
        "If-Modified-Since" => fields.if_modified_since = Some(value.to_string()),
        _ => unreachable!("RECOGNIZED_FIELDS is exhaustively matched above"),
    }

    Ok(())
}
