mod config;
mod constants;
mod core_cli;
mod core_ftpcommand;
mod core_jail;
mod core_log;
mod core_network;
mod core_privilege;
mod server;
mod session;
mod watchdog;

use crate::config::Config;
use crate::core_cli::Cli;
use crate::core_log::logger::init_logger;
use anyhow::Result;
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    init_logger(args.verbose);
    info!(
        "Starting, version {}, as PID {}",
        env!("CARGO_PKG_VERSION"),
        std::process::id()
    );

    // Load configuration, command line overriding the file
    let config = Config::load(&args)?;

    // Run the FTP server
    server::run(config).await
}
