use crate::constants::MAX_COMMAND_LINE;
use crate::core_ftpcommand::handlers::dispatch;
use crate::core_ftpcommand::utils::{format_multiline_reply, format_reply};
use crate::core_jail::{PathError, ResolvedPath};
use crate::core_network::data_channel::DataChannel;
use crate::core_network::error::SessionError;
use crate::core_network::network::ServerConfig;
use crate::watchdog::Watchdog;
use log::{debug, info};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const GREETING: &str = "Service ready for anonymous read-only access.";

/// How long a final notice may take before the connection is dropped anyway.
const FAREWELL_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    AwaitingUser,
    AwaitingPass,
    LoggedIn,
}

/// Representation type negotiated with TYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

impl TransferType {
    pub fn label(&self) -> &'static str {
        match self {
            TransferType::Ascii => "ASCII",
            TransferType::Binary => "BINARY",
        }
    }
}

/// What the session loop does after a command has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    Disconnected,
}

/// Orderly ways for a session to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    Disconnected,
    IdleTimeout,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Quit => write!(f, "client quit"),
            SessionEnd::Disconnected => write!(f, "client disconnected"),
            SessionEnd::IdleTimeout => write!(f, "idle timeout"),
        }
    }
}

/// One client's control connection and everything it has negotiated.
///
/// Owned by a single task for its whole life; nothing in here is shared
/// with other sessions.
pub struct Session {
    pub peer: SocketAddr,
    pub local: SocketAddr,
    pub config: Arc<ServerConfig>,
    /// Virtual working directory, normalized, always starting with `/`.
    pub current_dir: String,
    pub auth: AuthState,
    pub data_channel: Option<DataChannel>,
    /// Set by `EPSV ALL`: only EPSV may set up data connections afterwards.
    pub epsv_all: bool,
    pub transfer_type: TransferType,
    /// Byte offset for the next RETR, set by REST.
    pub restart_offset: u64,
    pub watchdog: Watchdog,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    pub fn new(stream: TcpStream, config: Arc<ServerConfig>) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        let (reader, writer) = stream.into_split();
        let watchdog = Watchdog::new(config.idle_timeout);

        Ok(Self {
            peer,
            local,
            config,
            current_dir: String::from("/"),
            auth: AuthState::AwaitingUser,
            data_channel: None,
            epsv_all: false,
            transfer_type: TransferType::Ascii,
            restart_offset: 0,
            watchdog,
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Greets the client and processes commands until QUIT, disconnect,
    /// idle timeout or a fatal error.
    ///
    /// The watchdog is raced against each whole command, data transfer
    /// included, and wins ties: an expired session is torn down even in
    /// the middle of waiting for a data connection.
    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        info!("Session started for {}", self.peer);
        self.reply(220, GREETING).await?;

        loop {
            let watchdog = self.watchdog.clone();
            let step = tokio::select! {
                biased;
                _ = watchdog.expired() => None,
                step = self.step() => Some(step),
            };

            match step {
                None => {
                    self.send_idle_timeout().await;
                    return Ok(SessionEnd::IdleTimeout);
                }
                Some(Ok(Flow::Continue)) => {}
                Some(Ok(Flow::Quit)) => return Ok(SessionEnd::Quit),
                Some(Ok(Flow::Disconnected)) => return Ok(SessionEnd::Disconnected),
                Some(Err(SessionError::LineTooLong(limit))) => {
                    let _ = self.reply(500, "Command line too long.").await;
                    return Err(SessionError::LineTooLong(limit));
                }
                Some(Err(SessionError::Path(e))) => {
                    let _ = self.reply_line(e.to_ftp_response()).await;
                    return Err(SessionError::Path(e));
                }
                Some(Err(e)) => return Err(e),
            }
        }
    }

    async fn step(&mut self) -> Result<Flow, SessionError> {
        let line = match self.read_command_line().await? {
            Some(line) => line,
            None => return Ok(Flow::Disconnected),
        };
        self.watchdog.defer();

        let flow = dispatch(self, &line).await?;
        self.watchdog.defer();
        Ok(flow)
    }

    /// Reads one line terminated by `\n` (a preceding `\r` is dropped).
    /// Returns `None` when the peer closes the connection, including in
    /// the middle of a line. The length limit applies to the content,
    /// not the terminator.
    async fn read_command_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut line = Vec::new();
        // Room for the longest accepted content plus CRLF.
        let limit = (MAX_COMMAND_LINE + 2) as u64;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            if read as u64 == limit {
                return Err(SessionError::LineTooLong(MAX_COMMAND_LINE));
            }
            debug!("{} disconnected in the middle of a command", self.peer);
            return Ok(None);
        }

        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.len() > MAX_COMMAND_LINE {
            return Err(SessionError::LineTooLong(MAX_COMMAND_LINE));
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    pub async fn reply(&mut self, code: u16, text: &str) -> Result<(), SessionError> {
        self.send_raw(format_reply(code, text).as_bytes()).await
    }

    /// Sends a pre-formatted reply such as those produced by the error
    /// types' `to_ftp_response`.
    pub async fn reply_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{}\r\n", line).as_bytes()).await
    }

    pub async fn reply_multiline(
        &mut self,
        code: u16,
        first: &str,
        lines: &[&str],
        last: &str,
    ) -> Result<(), SessionError> {
        self.send_raw(format_multiline_reply(code, first, lines, last).as_bytes())
            .await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn resolve(&self, virtual_path: &str) -> Result<ResolvedPath, PathError> {
        self.config.jail.resolve(&self.current_dir, virtual_path)
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth == AuthState::LoggedIn
    }

    async fn send_idle_timeout(&mut self) {
        info!(
            "{} idle for {}s, closing session",
            self.peer,
            self.watchdog.idle_for().as_secs()
        );
        let notice = format_reply(
            421,
            &format!(
                "Idle timeout ({} seconds): closing control connection.",
                self.watchdog.timeout().as_secs()
            ),
        );
        let farewell = self.writer.write_all(notice.as_bytes());
        if tokio::time::timeout(FAREWELL_WRITE_TIMEOUT, farewell)
            .await
            .is_err()
        {
            debug!("{}: idle timeout notice not delivered", self.peer);
        }
    }
}
