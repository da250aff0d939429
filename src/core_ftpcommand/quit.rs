use crate::core_network::error::SessionError;
use crate::session::Session;
use log::info;

/// Handles the QUIT FTP command.
///
/// Sends the farewell reply; the caller closes the control connection.
pub async fn handle_quit_command(session: &mut Session) -> Result<(), SessionError> {
    info!("Received QUIT from {}. Closing connection.", session.peer);
    session.reply(221, "Goodbye.").await
}
