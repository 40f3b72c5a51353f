//! §4.J — the error-page writer. Every error status that reaches component F
//! before any body bytes are sent routes through here.
//!
//! Grounded on the teacher's canned `HeaderTemplates` byte-literal responses
//! and `cbiffle-httpd1`'s `barf()` (`other_examples/...cbiffle-httpd1...`),
//! generalized from a handful of ad hoc statuses to the full `Status` enum.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::status::Status;
use crate::timestamp;

/// Writes a full status line + header block + minimal HTML body for
/// `status`. Returns the *effective* status for logging purposes: if the
/// write itself fails, that's reported as 408 per `spec.md` §4.J.
pub async fn write<W>(stream: &mut W, status: Status) -> Status
where
    W: AsyncWrite + Unpin,
{
    let body = format!(
        "<html><body><h1>{} {}</h1></body></html>",
        status.code(),
        status.reason()
    );

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nDate: {}\r\nConnection: close\r\n",
        status.code(),
        status.reason(),
        timestamp::format(None),
    );
    if status.needs_allow_header() {
        head.push_str("Allow: HEAD, GET\r\n");
    }
    head.push_str(&format!(
        "Content-Type: text/html\r\nContent-Length: {}\r\n\r\n",
        body.len()
    ));

    if stream.write_all(head.as_bytes()).await.is_err() {
        return Status::RequestTimeout408;
    }
    if stream.write_all(body.as_bytes()).await.is_err() {
        return Status::RequestTimeout408;
    }
    if stream.flush().await.is_err() {
        return Status::RequestTimeout408;
    }
    status
}
