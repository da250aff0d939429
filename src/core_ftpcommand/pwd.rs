// src/core_ftpcommand/pwd.rs
use crate::core_ftpcommand::utils::quote_path;
use crate::core_network::error::SessionError;
use crate::session::Session;

pub async fn handle_pwd_command(session: &mut Session) -> Result<(), SessionError> {
    let response = format!("{} is the current directory.", quote_path(&session.current_dir));
    session.reply(257, &response).await
}
