// Jail establishment and privilege drop, done once before serving.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use nix::unistd::{chdir, chroot, geteuid, setgid, setgroups, setuid, User};
use std::path::Path;

pub fn require_root() -> Result<()> {
    if !geteuid().is_root() {
        bail!("program needs root permission to run (use --no-chroot to run unprivileged)");
    }
    Ok(())
}

/// Looks up the account to run as. Must happen before the chroot, while
/// the password database is still reachable.
pub fn lookup_user(name: &str) -> Result<User> {
    User::from_name(name)
        .with_context(|| format!("error looking up user {}", name))?
        .ok_or_else(|| anyhow!("invalid user name: {}", name))
}

/// Confines the process to `root` and permanently becomes `user`.
///
/// Order matters: the chroot needs root, supplementary groups must go
/// while we can still drop them, and the gid must change before the uid.
pub fn enter_jail(root: &Path, user: &User) -> Result<()> {
    chroot(root).with_context(|| format!("error with root directory {}", root.display()))?;
    chdir("/").context("error changing directory")?;

    setgroups(&[]).context("error removing supplementary groups")?;
    setgid(user.gid).context("error changing group")?;
    setuid(user.uid).context("error changing user")?;

    info!(
        "Jailed to {} running as {} (uid {}, gid {})",
        root.display(),
        user.name,
        user.uid,
        user.gid
    );
    Ok(())
}
