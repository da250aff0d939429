use crate::constants::ANONYMOUS_USERNAMES;
use crate::core_network::error::SessionError;
use crate::session::{AuthState, Session};
use log::{info, warn};

/// Handles the USER FTP command.
///
/// Only the anonymous account exists. Any accepted name (re)starts the
/// login sequence; anything else leaves the session logged out.
///
/// # Arguments
///
/// * `session` - The session the command arrived on.
/// * `username` - The username provided by the client.
pub async fn handle_user_command(
    session: &mut Session,
    username: &str,
) -> Result<(), SessionError> {
    let username = username.trim();

    if is_anonymous(username) {
        info!("Anonymous login initiated from {}", session.peer);
        session.auth = AuthState::AwaitingPass;
        session
            .reply(
                331,
                "Anonymous login okay, send your complete email address as password.",
            )
            .await
    } else {
        warn!("Rejected login as {:?} from {}", username, session.peer);
        session.auth = AuthState::AwaitingUser;
        session.reply(530, "This FTP server is anonymous only.").await
    }
}

pub fn is_anonymous(username: &str) -> bool {
    ANONYMOUS_USERNAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(username))
}
