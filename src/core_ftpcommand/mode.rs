use crate::core_network::error::SessionError;
use crate::session::Session;

/// Only stream mode is supported.
pub async fn handle_mode_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    match arg.trim().to_ascii_uppercase().as_str() {
        "S" => session.reply(200, "Mode set to S.").await,
        "" => {
            session
                .reply(501, "Syntax error in parameters or arguments.")
                .await
        }
        _ => {
            session
                .reply(504, "Command not implemented for that parameter.")
                .await
        }
    }
}

/// Only file structure is supported.
pub async fn handle_stru_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    match arg.trim().to_ascii_uppercase().as_str() {
        "F" => session.reply(200, "Structure set to F.").await,
        "" => {
            session
                .reply(501, "Syntax error in parameters or arguments.")
                .await
        }
        _ => {
            session
                .reply(504, "Command not implemented for that parameter.")
                .await
        }
    }
}
