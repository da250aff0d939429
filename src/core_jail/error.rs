use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("path climbs above the jail root")]
    EscapesRoot,

    #[error("path does not exist")]
    NotFound,

    #[error("path contains characters that cannot name a file")]
    InvalidPath,

    #[error("path is not accessible: {0}")]
    Inaccessible(#[source] io::Error),

    #[error("jail root is no longer available: {0}")]
    RootUnavailable(#[source] io::Error),
}

impl PathError {
    /// A vanished jail root means no further path can be vetted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PathError::RootUnavailable(_))
    }

    /// Reply sent to the client. Never carries the underlying OS error,
    /// which could disclose the real location of the jail.
    pub fn to_ftp_response(&self) -> &'static str {
        match self {
            PathError::InvalidPath => "553 Requested action not taken. File name not allowed.",
            PathError::RootUnavailable(_) => {
                "421 Service not available, closing control connection."
            }
            _ => "550 No such file or directory.",
        }
    }
}
