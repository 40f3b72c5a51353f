//! Component K (argv half) — `spec.md` §6 CLI grammar:
//!
//! `quark [-v] [[[-h host] [-p port]] | [-U udsocket]] [-d dir] [-u user] [-g group]`
//!
//! plus the supplemental flags `SPEC_FULL.md` §6 adds for `docindex`/
//! `listdirs`/`maxnprocs`, which the distilled CLI grammar has no slot for but
//! a runnable binary must set from somewhere. Grounded on
//! `examples/kowito-chopin/crates/chopin-cli`'s use of `clap`'s derive API.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "quark", about = "Minimal HTTP/1.x static file server", disable_help_flag = true)]
pub struct Cli {
    /// Print version to stderr and exit 0.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    pub print_version: bool,

    /// Print help. `-h` is reserved for `--host` per `spec.md` §6's grammar,
    /// so unlike clap's default this flag has no short form.
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// TCP host to bind. Mutually exclusive with --unix-socket.
    #[arg(short = 'h', long = "host", default_value = "0.0.0.0", conflicts_with = "unix_socket")]
    pub host: String,

    /// TCP port to bind. Mutually exclusive with --unix-socket.
    #[arg(short = 'p', long = "port", default_value_t = 80, conflicts_with = "unix_socket")]
    pub port: u16,

    /// Unix-domain socket path. Mutually exclusive with --host/--port.
    #[arg(short = 'U', long = "unix-socket")]
    pub unix_socket: Option<PathBuf>,

    /// Document root to chroot into.
    #[arg(short = 'd', long = "dir", default_value = ".")]
    pub dir: PathBuf,

    /// User to drop privileges to.
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Group to drop privileges to.
    #[arg(short = 'g', long = "group")]
    pub group: Option<String>,

    /// Filename served in lieu of a directory listing.
    #[arg(long = "doc-index", default_value = "index.html")]
    pub doc_index: String,

    /// Generate an HTML directory listing when `doc-index` is missing.
    #[arg(long = "list-dirs", action = clap::ArgAction::SetTrue)]
    pub list_dirs: bool,

    /// Soft/hard NPROC rlimit to raise at startup. Defaults to leaving the
    /// current limit untouched.
    #[arg(long = "max-nprocs")]
    pub max_nprocs: Option<u64>,
}
