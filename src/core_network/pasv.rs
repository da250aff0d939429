use crate::core_network::data_channel::DataChannel;
use crate::core_network::error::SessionError;
use crate::session::Session;
use log::{debug, error};
use std::net::{IpAddr, Ipv4Addr};

/// Sets up a passive mode (PASV) listener and sends the response to the client.
///
/// The listener is bound on the address the client reached us on. The
/// connection itself is only accepted once a transfer command arrives.
pub async fn handle_pasv_command(session: &mut Session, _arg: &str) -> Result<(), SessionError> {
    if session.epsv_all {
        return session.reply(503, "PASV not allowed after EPSV ALL.").await;
    }

    let local_ip = match session.local.ip().to_canonical() {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => {
            return session
                .reply(501, "PASV is only available over IPv4, use EPSV.")
                .await
        }
    };

    match DataChannel::passive(IpAddr::V4(local_ip)).await {
        Ok((channel, addr)) => {
            session.data_channel = Some(channel);
            let response = format_pasv_reply(local_ip, addr.port());
            debug!("PASV response sent to {}: {}", session.peer, response);
            session.reply(227, &response).await
        }
        Err(e) => {
            error!("Failed to set up passive listener: {}", e);
            session.data_channel = None;
            session.reply(425, "Can't open passive connection.").await
        }
    }
}

/// Handles EPSV (RFC 2428). Works for both address families; `EPSV ALL`
/// locks the session into extended passive mode.
pub async fn handle_epsv_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    let local_ip = session.local.ip().to_canonical();
    let arg = arg.trim();

    if arg.eq_ignore_ascii_case("ALL") {
        session.epsv_all = true;
        return session.reply(200, "EPSV ALL ok.").await;
    }

    if !arg.is_empty() {
        let family_matches = match arg {
            "1" => local_ip.is_ipv4(),
            "2" => local_ip.is_ipv6(),
            _ => false,
        };
        if !family_matches {
            let supported = if local_ip.is_ipv4() { "(1)" } else { "(2)" };
            return session
                .reply(522, &format!("Network protocol not supported, use {}", supported))
                .await;
        }
    }

    match DataChannel::passive(local_ip).await {
        Ok((channel, addr)) => {
            session.data_channel = Some(channel);
            session
                .reply(229, &format_epsv_reply(addr.port()))
                .await
        }
        Err(e) => {
            error!("Failed to set up extended passive listener: {}", e);
            session.data_channel = None;
            session.reply(425, "Can't open passive connection.").await
        }
    }
}

pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!(
        "Entering Passive Mode ({},{},{},{},{},{}).",
        a,
        b,
        c,
        d,
        port >> 8,
        port & 0xff
    )
}

pub fn format_epsv_reply(port: u16) -> String {
    format!("Entering Extended Passive Mode (|||{}|)", port)
}
