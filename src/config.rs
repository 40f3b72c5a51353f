//! Process-wide configuration (`spec.md` §3). Built once at startup from
//! [`crate::cli::Cli`], then handed to every component by `Arc` clone — no
//! mutable process-wide configuration statics exist in the core, per the
//! Design Notes §9 guidance in `spec.md` ("configuration is a value read once
//! at startup and passed (by borrow) to every component").

use std::path::PathBuf;

use crate::cli::Cli;
use crate::mime;

/// Where to listen.
#[derive(Clone, Debug)]
pub enum BindTarget {
    Tcp { host: String, port: u16 },
    Unix { path: PathBuf },
}

/// Immutable, process-wide configuration snapshot.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind: BindTarget,
    pub servedir: PathBuf,
    pub user: Option<String>,
    pub group: Option<String>,
    pub docindex: String,
    pub listdirs: bool,
    pub mimes: Vec<(String, String)>,
    pub maxnprocs: Option<u64>,
    /// Whether `setup::chroot_into` has actually run for this process. Once
    /// it has, `servedir` *is* `/` from the process's point of view, so
    /// component F must resolve request targets relative to the current
    /// directory instead of re-prefixing `servedir`. Defaults to `false`;
    /// `main` flips it after a successful chroot, before handing the config
    /// to `accept::run`.
    pub chrooted: bool,
}

impl Config {
    /// Builds a `Config` from parsed CLI args. This does not touch the
    /// filesystem or any privileged syscall; that happens in `setup`.
    pub fn from_cli(cli: Cli) -> Self {
        let bind = match cli.unix_socket {
            Some(path) => BindTarget::Unix { path },
            None => BindTarget::Tcp {
                host: cli.host,
                port: cli.port,
            },
        };

        Config {
            bind,
            servedir: cli.dir,
            user: cli.user,
            group: cli.group,
            docindex: cli.doc_index,
            listdirs: cli.list_dirs,
            mimes: mime::DEFAULT_TABLE.clone(),
            maxnprocs: cli.max_nprocs,
            chrooted: false,
        }
    }
}
