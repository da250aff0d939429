use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_network::error::SessionError;
use crate::session::Session;
use log::info;

/// Refuses every command that would change the served tree. Nothing is
/// attempted on disk, whatever the argument.
pub async fn handle_denied_command(
    session: &mut Session,
    command: FtpCommand,
) -> Result<(), SessionError> {
    info!("{}: refused write command {:?}", session.peer, command);
    session.reply(550, "Permission denied.").await
}
