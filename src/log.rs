//! Ambient stack — the protocol-shaped access log on stdout, kept strictly
//! separate from `tracing`'s unstructured stderr diagnostics.
//!
//! Grounded on the teacher's `println!`-based access-log philosophy, but
//! formalized behind a mutex-guarded single writer: `spec.md` Design Notes §9
//! warns against sharing mutable buffers across workers, so the mutex here
//! guards only the write itself, not any state workers read between writes.

use std::io::Write;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::status::Status;
use crate::timestamp;

static SINK: Lazy<Mutex<std::io::Stdout>> = Lazy::new(|| Mutex::new(std::io::stdout()));

/// Writes one access-log line: `YYYY-MM-DDTHH:MM:SS\tPEER\tSTATUS\tTARGET\n`
/// (`spec.md` §6 "Log format"). Lines are expected to stay under `PIPE_BUF`
/// so concurrent workers' writes interleave at line granularity rather than
/// mid-line; the mutex here only serializes this process's own writers
/// against each other.
///
/// A write failure here is not itself logged (there is nowhere left to put
/// the failure) and is silently dropped, matching the teacher's own
/// best-effort `println!` logging.
pub fn record(peer: &str, status: Status, target: &str) {
    let line = format!(
        "{}\t{}\t{}\t{}\n",
        timestamp::format_iso8601(None),
        peer,
        status.code(),
        target,
    );
    let mut sink = SINK.lock();
    let _ = sink.write_all(line.as_bytes());
    let _ = sink.flush();
}
