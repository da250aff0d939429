use crate::core_jail::PathError;
use crate::core_network::data_channel::DataChannel;
use crate::core_network::error::{DataChannelError, SessionError};
use crate::session::Session;
use log::{debug, warn};
use tokio::net::TcpStream;

/// Formats a single-line reply, e.g. `250 Directory successfully changed.\r\n`.
pub fn format_reply(code: u16, text: &str) -> String {
    format!("{} {}\r\n", code, single_line(text))
}

/// Formats a multi-line reply: `code-first`, indented body lines, `code last`.
pub fn format_multiline_reply(code: u16, first: &str, lines: &[&str], last: &str) -> String {
    let mut reply = format!("{}-{}\r\n", code, single_line(first));
    for line in lines {
        reply.push(' ');
        reply.push_str(&single_line(line));
        reply.push_str("\r\n");
    }
    reply.push_str(&format_reply(code, last));
    reply
}

/// Client-controlled text (file names, arguments) must not be able to
/// inject extra reply lines.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Quotes a path for a 257 reply, doubling embedded quotes.
pub fn quote_path(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}

/// Answers a failed path resolution with `reply`, or ends the session if
/// the jail itself can no longer be trusted.
pub async fn reject_path(
    session: &mut Session,
    error: PathError,
    reply: &str,
) -> Result<(), SessionError> {
    if error.is_fatal() {
        return Err(SessionError::Path(error));
    }
    debug!("{}: path rejected: {}", session.peer, error);
    match error {
        PathError::InvalidPath => session.reply_line(error.to_ftp_response()).await,
        _ => session.reply_line(reply).await,
    }
}

/// Connects the pending data channel, replying 425 when there is none or
/// it cannot be established. `Ok(None)` means the reply has been sent and
/// the transfer command is over.
pub async fn establish_data_connection(
    session: &mut Session,
    channel: Option<DataChannel>,
) -> Result<Option<TcpStream>, SessionError> {
    let result = match channel {
        Some(channel) => {
            channel
                .establish(session.peer.ip(), session.config.data_timeout)
                .await
        }
        None => Err(DataChannelError::NotConfigured),
    };

    match result {
        Ok(stream) => Ok(Some(stream)),
        Err(e) => {
            warn!("{}: data connection failed: {}", session.peer, e);
            session.reply_line(e.to_ftp_response()).await?;
            Ok(None)
        }
    }
}
