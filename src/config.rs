use crate::constants::{
    DATA_CONNECTION_TIMEOUT, DEFAULT_CONFIG_PATH, DOWNLOAD_BUFFER_SIZE, FTP_ADDRESS, FTP_PORT,
    INACTIVITY_TIMEOUT, MAX_CLIENTS, MAX_NUM_CLIENTS, MAX_TIMEOUT_SECS, MIN_NUM_CLIENTS,
};
use crate::core_cli::Cli;
use crate::core_jail::JailRoot;
use crate::core_network::network::ServerConfig;
use anyhow::{ensure, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The `[server]` section of the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerOptions {
    pub listen_address: String,
    pub listen_port: u16,
    pub max_clients: usize,
    /// Seconds.
    pub idle_timeout: u64,
    /// Seconds.
    pub data_timeout: u64,
    pub root_dir: String,
    pub user: String,
    pub chroot: bool,
    pub download_buffer_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerOptions,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            listen_address: String::from(FTP_ADDRESS),
            listen_port: FTP_PORT,
            max_clients: MAX_CLIENTS,
            idle_timeout: INACTIVITY_TIMEOUT.as_secs(),
            data_timeout: DATA_CONNECTION_TIMEOUT.as_secs(),
            root_dir: String::from("/var/ftp"),
            user: String::from("ftp"),
            chroot: true,
            download_buffer_size: DOWNLOAD_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Builds the effective configuration: file (explicit, or the default
    /// path if it exists, or built-in defaults), then command-line
    /// overrides, then validation.
    pub fn load(args: &Cli) -> Result<Self> {
        let mut config = match args.config.as_deref() {
            Some(path) => Self::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                info!("No configuration file, using built-in defaults");
                Self::default()
            }
        };

        config.apply_cli_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        Self::parse(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn apply_cli_overrides(&mut self, args: &Cli) {
        let server = &mut self.server;
        if let Some(port) = args.port {
            server.listen_port = port;
        }
        if let Some(interface) = &args.interface {
            server.listen_address = interface.clone();
        }
        if let Some(max_clients) = args.max_clients {
            server.max_clients = max_clients;
        }
        if let Some(idle_timeout) = args.idle_timeout {
            server.idle_timeout = idle_timeout;
        }
        if args.no_chroot {
            server.chroot = false;
        }
        if let Some(user) = &args.user {
            server.user = user.clone();
        }
        if let Some(root) = &args.root {
            server.root_dir = root.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        ensure!(server.listen_port != 0, "port must be a number between 1 and 65535");
        ensure!(
            (MIN_NUM_CLIENTS..=MAX_NUM_CLIENTS).contains(&server.max_clients),
            "max clients must be a number between {} and {}",
            MIN_NUM_CLIENTS,
            MAX_NUM_CLIENTS
        );
        ensure!(
            (1..=MAX_TIMEOUT_SECS).contains(&server.idle_timeout),
            "idle timeout must be between 1 and {} seconds",
            MAX_TIMEOUT_SECS
        );
        ensure!(
            (1..=MAX_TIMEOUT_SECS).contains(&server.data_timeout),
            "data timeout must be between 1 and {} seconds",
            MAX_TIMEOUT_SECS
        );
        ensure!(
            server.download_buffer_size > 0,
            "download buffer size must not be zero"
        );
        ensure!(!server.root_dir.is_empty(), "missing root directory");
        ensure!(
            !server.chroot || !server.user.is_empty(),
            "missing user name to run as"
        );
        Ok(())
    }

    /// Engine settings for the given jail.
    pub fn to_server_config(&self, jail: JailRoot) -> ServerConfig {
        ServerConfig {
            listen_address: self.server.listen_address.clone(),
            listen_port: self.server.listen_port,
            max_clients: self.server.max_clients,
            idle_timeout: Duration::from_secs(self.server.idle_timeout),
            data_timeout: Duration::from_secs(self.server.data_timeout),
            download_buffer_size: self.server.download_buffer_size,
            jail,
        }
    }
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    let server = &config.server;
    info!("  Listen Address: {}", server.listen_address);
    info!("  Listen Port: {}", server.listen_port);
    info!("  Max Clients: {}", server.max_clients);
    info!("  Idle Timeout: {}s", server.idle_timeout);
    info!("  Data Timeout: {}s", server.data_timeout);
    info!("  Root Directory: {}", server.root_dir);
    info!("  Chroot: {}", server.chroot);
    if server.chroot {
        info!("  Run As User: {}", server.user);
    }
    info!(
        "  Download Buffer Size: {} KB",
        server.download_buffer_size / 1024
    );
}
