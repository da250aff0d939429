use crate::core_network::error::SessionError;
use crate::session::{AuthState, Session};
use log::info;

/// Any password completes an anonymous login; it is never checked or logged.
pub async fn handle_pass_command(
    session: &mut Session,
    _password: &str,
) -> Result<(), SessionError> {
    match session.auth {
        AuthState::AwaitingPass => {
            session.auth = AuthState::LoggedIn;
            info!("Anonymous user logged in from {}", session.peer);
            session.reply(230, "User logged in, proceed.").await
        }
        AuthState::LoggedIn => session.reply(503, "Already logged in.").await,
        AuthState::AwaitingUser => session.reply(503, "Login with USER first.").await,
    }
}
