use crate::core_network::error::SessionError;
use crate::session::Session;

/// Sets the byte offset the next RETR starts from.
pub async fn handle_rest_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    match arg.trim().parse::<u64>() {
        Ok(offset) => {
            session.restart_offset = offset;
            let response = format!("Restarting at {}. Send RETR to initiate transfer.", offset);
            session.reply(350, &response).await
        }
        Err(_) => {
            session.restart_offset = 0;
            session
                .reply(501, "REST requires a non-negative byte offset.")
                .await
        }
    }
}
