use crate::core_network::error::SessionError;
use crate::session::Session;
use log::debug;

/// Handles the SYST (System) FTP command.
///
/// Always reports a Unix system with 8-bit bytes, which is what clients
/// expect when parsing `ls -l` style listings.
pub async fn handle_syst_command(session: &mut Session) -> Result<(), SessionError> {
    debug!("Responding to SYST command with system type.");
    session.reply(215, "UNIX Type: L8").await
}
