//! §4.H — the connection worker: one socket, one request, one log line.
//!
//! Grounded on the teacher's `handle_connection`/`handle_connection_inner`
//! split (outer `tokio::time::timeout` wrapping an inner body), rewritten as
//! a single pass with no keep-alive loop per `spec.md` Non-goals.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use crate::config::Config;
use crate::error_page;
use crate::log;
use crate::request;
use crate::response;
use crate::status::Status;

/// Socket-level receive/send budget (`spec.md` §4.H step 1 / §5 "30-second
/// socket timeout").
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the full per-connection lifecycle against an already-accepted
/// stream: parse one request, generate one response, log one line. Never
/// panics on a misbehaving peer; every failure path degrades to a status
/// code and a log line.
pub async fn serve<S>(stream: &mut S, peer: &str, config: &Config)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let parsed = match timeout(IO_TIMEOUT, request::parse(stream)).await {
        Ok(result) => result,
        Err(_) => Err(crate::error::ParseFault::Timeout),
    };

    let request = match parsed {
        Ok(request) => request,
        Err(fault) => {
            let status = Status::from(&fault);
            let effective = error_page::write(stream, status).await;
            log::record(peer, effective, "");
            return;
        }
    };

    let target = request.target.clone();
    let status = match timeout(IO_TIMEOUT, response::generate(stream, &request, config)).await {
        Ok(status) => status,
        Err(_) => Status::RequestTimeout408,
    };

    log::record(peer, status, &target);
}
