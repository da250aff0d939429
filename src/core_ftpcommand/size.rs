use crate::core_ftpcommand::utils::reject_path;
use crate::core_network::error::SessionError;
use crate::session::Session;

const NO_SUCH_FILE: &str = "550 Could not get file size.";

/// Handles the SIZE FTP command: the size on disk of a regular file.
pub async fn handle_size_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    if arg.is_empty() {
        return session
            .reply(501, "Syntax error in parameters or arguments.")
            .await;
    }

    let resolved = match session.resolve(arg) {
        Ok(resolved) => resolved,
        Err(e) => return reject_path(session, e, NO_SUCH_FILE).await,
    };

    match tokio::fs::metadata(resolved.real_path()).await {
        Ok(metadata) if metadata.is_file() => {
            session.reply(213, &metadata.len().to_string()).await
        }
        _ => session.reply_line(NO_SUCH_FILE).await,
    }
}
