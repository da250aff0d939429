// src/constants.rs

use std::time::Duration;

pub const FTP_PORT: u16 = 21;
pub const FTP_ADDRESS: &str = "0.0.0.0";

pub const MAX_CLIENTS: usize = 250;
pub const MIN_NUM_CLIENTS: usize = 1;
pub const MAX_NUM_CLIENTS: usize = 300;

pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DATA_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound, in seconds, for the idle and data connection timeouts.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Longest command line accepted, excluding the terminator.
pub const MAX_COMMAND_LINE: usize = 4096;

pub const DOWNLOAD_BUFFER_SIZE: usize = 128 * 1024;

/// Login names accepted for the anonymous account (compared case-insensitively).
pub const ANONYMOUS_USERNAMES: [&str; 2] = ["anonymous", "ftp"];

pub const DEFAULT_CONFIG_PATH: &str = "/etc/anonftpd.conf";
