use crate::constants::{MAX_NUM_CLIENTS, MAX_TIMEOUT_SECS, MIN_NUM_CLIENTS};
use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(
    name = "anonftpd",
    version,
    about = "A read-only anonymous FTP server written in Rust."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Address or host name to listen on
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Maximum number of simultaneous clients
    #[arg(short, long, value_parser = parse_max_clients)]
    pub max_clients: Option<usize>,

    /// Seconds of inactivity before a client is disconnected
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub idle_timeout: Option<u64>,

    /// Serve without chroot or privilege drop (development only)
    #[arg(long)]
    pub no_chroot: bool,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Unprivileged user to run as
    pub user: Option<String>,

    /// Directory tree to serve
    pub root: Option<String>,
}

fn parse_max_clients(value: &str) -> Result<usize, String> {
    let clients: usize = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if (MIN_NUM_CLIENTS..=MAX_NUM_CLIENTS).contains(&clients) {
        Ok(clients)
    } else {
        Err(format!(
            "max clients must be a number between {} and {}",
            MIN_NUM_CLIENTS, MAX_NUM_CLIENTS
        ))
    }
}
