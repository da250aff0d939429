use crate::core_ftpcommand::utils::reject_path;
use crate::core_network::error::SessionError;
use crate::session::Session;
use chrono::{DateTime, Utc};
use std::time::SystemTime;

const NO_SUCH_FILE: &str = "550 Could not get file modification time.";

/// Handles the MDTM FTP command: last modification time of a regular file
/// as `YYYYMMDDHHMMSS` in UTC.
pub async fn handle_mdtm_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    if arg.is_empty() {
        return session
            .reply(501, "Syntax error in parameters or arguments.")
            .await;
    }

    let resolved = match session.resolve(arg) {
        Ok(resolved) => resolved,
        Err(e) => return reject_path(session, e, NO_SUCH_FILE).await,
    };

    let modified = match tokio::fs::metadata(resolved.real_path()).await {
        Ok(metadata) if metadata.is_file() => metadata.modified(),
        _ => return session.reply_line(NO_SUCH_FILE).await,
    };

    match modified {
        Ok(modified) => session.reply(213, &format_mdtm(modified)).await,
        Err(_) => session.reply_line(NO_SUCH_FILE).await,
    }
}

pub fn format_mdtm(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%Y%m%d%H%M%S").to_string()
}
