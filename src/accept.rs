//! §4.I — the accept loop. Dispatches one worker task per accepted
//! connection over either a TCP or Unix-domain listener.
//!
//! Grounded on the teacher's `main` accept loop (`listener.accept()` inside
//! a `tokio::select!`), extended to a transport-agnostic `Listener` so the
//! same loop body serves both `setup::bind_tcp` and `setup::bind_unix`.

use std::sync::Arc;

use tokio::net::{TcpListener, UnixListener};

use crate::config::Config;
use crate::worker;

/// An already-bound, already-listening socket, TCP or Unix-domain.
pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

/// The formatted peer identity for the access log: `inet_ntop`-style IP-only
/// (no port) for TCP, `-` for UDS (no peer address exists). `spec.md` §4.H
/// step 3 specifies "PEER is `inet_ntop` of the peer address (v4 or v6)", and
/// `inet_ntop` never includes a port.
fn format_peer_tcp(addr: std::net::SocketAddr) -> String {
    addr.ip().to_string()
}

/// Runs the accept loop forever. On an `accept` error, logs to stderr via
/// `tracing` and continues (`spec.md` §4.I); never returns.
pub async fn run(listener: Listener, config: Arc<Config>) -> ! {
    match listener {
        Listener::Tcp(listener) => loop {
            match listener.accept().await {
                Ok((mut stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    let config = Arc::clone(&config);
                    let peer = format_peer_tcp(addr);
                    tokio::spawn(async move {
                        worker::serve(&mut stream, &peer, &config).await;
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                }
            }
        },
        Listener::Unix(listener) => loop {
            match listener.accept().await {
                Ok((mut stream, _addr)) => {
                    let config = Arc::clone(&config);
                    tokio::spawn(async move {
                        worker::serve(&mut stream, "-", &config).await;
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                }
            }
        },
    }
}
