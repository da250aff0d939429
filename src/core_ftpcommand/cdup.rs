use crate::core_ftpcommand::cwd::change_directory;
use crate::core_network::error::SessionError;
use crate::session::Session;

/// CDUP is CWD to the parent. At the jail root there is no parent and the
/// command fails like any other attempt to climb out.
pub async fn handle_cdup_command(session: &mut Session) -> Result<(), SessionError> {
    change_directory(session, "..").await
}
