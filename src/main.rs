//! Binary entry point: parse argv, wire up diagnostics, run the startup
//! collaborator contract (component K), then hand off to the accept loop.
//!
//! Grounded on the teacher's `#[tokio::main] async fn main` shape; setup
//! failures use `anyhow` at the process boundary the way `chopin-cli` does,
//! distinct from the typed `ParseFault`/`ResponseFault` the core uses.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use quark::cli::Cli;
use quark::config::Config;
use quark::{accept, setup};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_version {
        eprintln!("quark {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = Config::from_cli(cli);

    if let Some(limit) = config.maxnprocs {
        if let Err(err) = setup::raise_nproc_limit(limit) {
            eprintln!("quark: {err:#}");
            return ExitCode::FAILURE;
        }
    }

    // Resolve user/group names to numeric ids before chrooting: `getpwnam`/
    // `getgrnam` read `/etc/passwd`/`/etc/group` via NSS, which are not
    // reachable once the process has chrooted into the document root.
    let identity = match setup::resolve_identity(config.user.as_deref(), config.group.as_deref())
    {
        Ok(identity) => identity,
        Err(err) => {
            eprintln!("quark: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match setup::bind(&config).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("quark: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = setup::chroot_into(&config.servedir) {
        eprintln!("quark: {err:#}");
        return ExitCode::FAILURE;
    }
    config.chrooted = true;

    if identity.uid.is_some() || identity.gid.is_some() {
        if let Err(err) = setup::drop_privileges(identity) {
            eprintln!("quark: {err:#}");
            return ExitCode::FAILURE;
        }
    }

    let config = Arc::new(config);
    tracing::info!(bind = ?config.bind, "quark listening");
    accept::run(listener, config).await;
}
