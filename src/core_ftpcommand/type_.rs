use crate::core_network::error::SessionError;
use crate::session::{Session, TransferType};

/// Handles the TYPE FTP command.
///
/// ASCII (optionally with the `N` non-print format) and image/binary
/// (`I`, or `L 8`) are supported. EBCDIC and other byte sizes are not.
///
/// # Arguments
///
/// * `session` - The session whose representation type changes.
/// * `arg` - The argument specifying the transfer type.
pub async fn handle_type_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    let parts: Vec<String> = arg
        .split_whitespace()
        .map(|part| part.to_ascii_uppercase())
        .collect();
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();

    let (transfer_type, response) = match parts.as_slice() {
        ["A"] | ["A", "N"] => (TransferType::Ascii, "Type set to A."),
        ["I"] => (TransferType::Binary, "Type set to I."),
        ["L", "8"] => (TransferType::Binary, "Type set to L 8."),
        [] => {
            return session
                .reply(501, "Syntax error in parameters or arguments.")
                .await
        }
        _ => {
            return session
                .reply(504, "Command not implemented for that parameter.")
                .await
        }
    };

    session.transfer_type = transfer_type;
    session.reply(200, response).await
}
