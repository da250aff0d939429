use crate::config::{log_config, Config};
use crate::core_jail::JailRoot;
use crate::core_network::network::FtpListener;
use crate::core_privilege::{enter_jail, lookup_user, require_root};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};

/// Runs the FTP server with the provided configuration until SIGINT or
/// SIGTERM, then drains the live sessions.
///
/// The control socket is bound first (the port may be privileged), then
/// the process is jailed and drops to the unprivileged user, and only
/// then does it start accepting connections.
///
/// # Arguments
///
/// * `config` - The validated server configuration.
///
/// # Returns
///
/// Result<(), anyhow::Error> indicating the success or failure of the operation.
pub async fn run(config: Config) -> Result<()> {
    log_config(&config);
    let root_dir = Path::new(&config.server.root_dir);

    let jail_user = if config.server.chroot {
        require_root()?;
        Some(lookup_user(&config.server.user)?)
    } else {
        warn!("chroot disabled, confinement relies on path resolution alone");
        None
    };

    ensure_directory(root_dir)?;
    // Once chroot-ed the served tree is the filesystem root.
    let jail_path = if jail_user.is_some() {
        Path::new("/")
    } else {
        root_dir
    };
    let jail = JailRoot::new(jail_path)
        .with_context(|| format!("error with root directory {}", root_dir.display()))?;
    info!("Paths resolve under {}", jail.path().display());

    let listener = FtpListener::bind(config.to_server_config(jail))
        .await
        .context("error initializing FTP listener")?;

    if let Some(user) = &jail_user {
        info!("Bound to {}, entering jail", listener.local_addr());
        enter_jail(root_dir, user)?;
    }

    let server = listener.start();
    info!("Accepting connections on {}", server.local_addr());

    let signal_name = wait_for_shutdown_signal().await?;
    info!("{} received, shutting down", signal_name);
    server.stop().await;
    info!("all connections finished, FTP server exiting");

    Ok(())
}

fn ensure_directory(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("error with root directory {}", path.display()))?;
    anyhow::ensure!(metadata.is_dir(), "{} is not a directory", path.display());
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut terminate =
        signal(SignalKind::terminate()).context("error installing SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("error waiting for SIGINT")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}
