use crate::core_jail::PathError;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent the service from starting.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot resolve listen address {0}: {1}")]
    Unresolvable(String, #[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that end a single session. Other sessions and the listener are
/// unaffected.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("control connection I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("command line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("jail integrity violation: {0}")]
    Path(#[from] PathError),
}

#[derive(Error, Debug)]
pub enum DataChannelError {
    #[error("no PORT, EPRT, PASV or EPSV issued")]
    NotConfigured,

    #[error("no data connection within {0:?}")]
    AcceptTimeout(Duration),

    #[error("cannot connect to {0}: {1}")]
    ConnectFailed(SocketAddr, #[source] io::Error),

    #[error("data connection from unexpected peer {0}")]
    UnexpectedPeer(SocketAddr),

    #[error("data connection I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DataChannelError {
    pub fn to_ftp_response(&self) -> &'static str {
        match self {
            DataChannelError::NotConfigured => "425 Use PORT or PASV first.",
            _ => "425 Can't open data connection.",
        }
    }
}

/// A transfer that started but did not finish.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("reading source failed: {0}")]
    Read(#[source] io::Error),

    #[error("writing to data connection failed: {0}")]
    Write(#[source] io::Error),
}

impl TransferError {
    pub fn to_ftp_response(&self) -> &'static str {
        match self {
            TransferError::Read(_) => "451 Requested action aborted: local error in processing.",
            TransferError::Write(_) => "426 Connection closed; transfer aborted.",
        }
    }
}
