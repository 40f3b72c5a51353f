//! Component K — the startup collaborator contract `spec.md` §6 describes:
//! raise `RLIMIT_NPROC`, bind the listening socket, `chdir`+`chroot` into the
//! document root, resolve and drop privileges. None of this has a teacher
//! precedent (the teacher never drops privileges or chroots); grounded on
//! `spec.md` §6's explicit syscall sequence, using `libc` directly the way
//! `chopin-core` reaches for it in its own dependency set.

use std::ffi::CString;
use std::io;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tokio::net::{TcpListener, UnixListener};

use crate::accept::Listener;
use crate::config::{BindTarget, Config};

/// Binds the listening socket named by `config.bind`. TCP binds directly
/// (the runtime's resolver stands in for `getaddrinfo`); a Unix-domain
/// socket is unlinked first so a stale socket file from a prior run doesn't
/// block the bind, matching `spec.md`'s `unlink`-then-bind instruction.
pub async fn bind(config: &Config) -> Result<Listener> {
    match &config.bind {
        BindTarget::Tcp { host, port } => {
            let listener = TcpListener::bind((host.as_str(), *port))
                .await
                .with_context(|| format!("binding {host}:{port}"))?;
            Ok(Listener::Tcp(listener))
        }
        BindTarget::Unix { path } => {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context("removing stale unix socket"),
            }
            let listener = UnixListener::bind(path)
                .with_context(|| format!("binding unix socket {}", path.display()))?;
            Ok(Listener::Unix(listener))
        }
    }
}

/// `chdir(servedir)` followed by `chroot(".")`, per `spec.md` §6. Must run
/// before privilege drop: `chroot` itself requires `CAP_SYS_CHROOT`/root.
pub fn chroot_into(servedir: &Path) -> Result<()> {
    let c_path = path_to_cstring(servedir)?;
    let rc = unsafe { libc::chdir(c_path.as_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error())
            .with_context(|| format!("chdir({})", servedir.display()));
    }

    let dot = CString::new(".").expect("no interior NUL");
    let rc = unsafe { libc::chroot(dot.as_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error()).context("chroot(\".\")");
    }

    Ok(())
}

/// The numeric uid/gid a `user`/`group` pair resolves to, looked up while
/// `/etc/passwd`/`/etc/group` are still reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolvedIdentity {
    pub uid: Option<libc::uid_t>,
    pub gid: Option<libc::gid_t>,
}

/// Resolves `user`/`group` names to numeric ids via `getpwnam`/`getgrnam`.
/// `spec.md` §6 requires this run *before* `chroot_into`: NSS lookups read
/// `/etc/passwd` and `/etc/group`, which are not reachable once the process
/// has chrooted into a content-only document root.
pub fn resolve_identity(user: Option<&str>, group: Option<&str>) -> Result<ResolvedIdentity> {
    Ok(ResolvedIdentity {
        uid: user.map(resolve_user).transpose()?,
        gid: group.map(resolve_group).transpose()?,
    })
}

/// Drops privileges to an already-resolved identity, in the mandated order:
/// `setgroups` (clear supplementary groups) → `setgid` → `setuid`. Refuses to
/// continue if the effective uid or gid is still 0 afterward, per `spec.md`
/// §6's explicit guard. Callers must resolve names via [`resolve_identity`]
/// *before* `chroot_into`, then call this *after* it.
pub fn drop_privileges(identity: ResolvedIdentity) -> Result<()> {
    if let Some(gid) = identity.gid {
        let rc = unsafe { libc::setgroups(0, std::ptr::null()) };
        if rc != 0 {
            return Err(io::Error::last_os_error()).context("setgroups");
        }
        let rc = unsafe { libc::setgid(gid) };
        if rc != 0 {
            return Err(io::Error::last_os_error()).context("setgid");
        }
    }

    if let Some(uid) = identity.uid {
        let rc = unsafe { libc::setuid(uid) };
        if rc != 0 {
            return Err(io::Error::last_os_error()).context("setuid");
        }
    }

    let euid = unsafe { libc::geteuid() };
    let egid = unsafe { libc::getegid() };
    if euid == 0 || egid == 0 {
        bail!("refusing to serve requests as root (euid={euid}, egid={egid})");
    }

    Ok(())
}

/// Raises `RLIMIT_NPROC` to `limit`, both soft and hard.
pub fn raise_nproc_limit(limit: u64) -> Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: limit,
        rlim_max: limit,
    };
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_NPROC, &rlim) };
    if rc != 0 {
        return Err(io::Error::last_os_error()).context("setrlimit(RLIMIT_NPROC)");
    }
    Ok(())
}

fn resolve_user(name: &str) -> Result<libc::uid_t> {
    let c_name = CString::new(name).map_err(|_| anyhow!("user name contains a NUL byte"))?;
    let passwd = unsafe { libc::getpwnam(c_name.as_ptr()) };
    if passwd.is_null() {
        bail!("unknown user: {name}");
    }
    Ok(unsafe { (*passwd).pw_uid })
}

fn resolve_group(name: &str) -> Result<libc::gid_t> {
    let c_name = CString::new(name).map_err(|_| anyhow!("group name contains a NUL byte"))?;
    let group = unsafe { libc::getgrnam(c_name.as_ptr()) };
    if group.is_null() {
        bail!("unknown group: {name}");
    }
    Ok(unsafe { (*group).gr_gid })
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| anyhow!("path contains a NUL byte: {}", path.display()))
}
