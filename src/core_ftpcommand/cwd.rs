use crate::core_ftpcommand::utils::reject_path;
use crate::core_network::error::SessionError;
use crate::session::Session;
use log::info;

const NO_SUCH_DIRECTORY: &str = "550 No such directory.";

pub async fn handle_cwd_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    if arg.is_empty() {
        return session
            .reply(501, "Syntax error in parameters or arguments.")
            .await;
    }
    change_directory(session, arg).await
}

/// Moves the virtual working directory to `target` if it resolves to a
/// directory inside the jail. On failure the working directory is left
/// untouched.
pub async fn change_directory(session: &mut Session, target: &str) -> Result<(), SessionError> {
    let resolved = match session.resolve(target) {
        Ok(resolved) => resolved,
        Err(e) => return reject_path(session, e, NO_SUCH_DIRECTORY).await,
    };

    if !resolved.real_path().is_dir() {
        return session.reply_line(NO_SUCH_DIRECTORY).await;
    }

    session.current_dir = resolved.virtual_path().to_string();
    info!(
        "{}: directory changed to {}",
        session.peer, session.current_dir
    );
    session.reply(250, "Directory successfully changed.").await
}
