use crate::core_network::data_channel::DataChannel;
use crate::core_network::error::SessionError;
use crate::session::Session;
use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Lowest port PORT/EPRT may point at; lower ones are reserved services.
const MIN_ACTIVE_PORT: u16 = 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum EprtError {
    Syntax,
    UnsupportedProtocol,
}

/// Handles the PORT (Active Mode) FTP command.
///
/// Only records the target; the connection is made when a transfer
/// command needs it.
pub async fn handle_port_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    if session.epsv_all {
        return session.reply(503, "PORT not allowed after EPSV ALL.").await;
    }

    let target = match parse_port_argument(arg) {
        Some(target) => target,
        None => {
            return session
                .reply(501, "Syntax error in parameters or arguments.")
                .await
        }
    };

    set_active_target(session, target).await
}

/// Handles EPRT (RFC 2428), the address-family independent PORT.
pub async fn handle_eprt_command(session: &mut Session, arg: &str) -> Result<(), SessionError> {
    if session.epsv_all {
        return session.reply(503, "EPRT not allowed after EPSV ALL.").await;
    }

    match parse_eprt_argument(arg) {
        Ok(target) => set_active_target(session, target).await,
        Err(EprtError::UnsupportedProtocol) => {
            session
                .reply(522, "Network protocol not supported, use (1,2)")
                .await
        }
        Err(EprtError::Syntax) => {
            session
                .reply(501, "Syntax error in parameters or arguments.")
                .await
        }
    }
}

/// Accepts `target` only if it points back at the client itself on an
/// unprivileged port, so the server cannot be used to bounce connections
/// to third parties.
async fn set_active_target(session: &mut Session, target: SocketAddr) -> Result<(), SessionError> {
    if target.ip().to_canonical() != session.peer.ip().to_canonical() {
        warn!(
            "{}: refused active data connection to foreign host {}",
            session.peer, target
        );
        return session
            .reply(501, "Data connection must go to the control connection's host.")
            .await;
    }
    if target.port() < MIN_ACTIVE_PORT {
        return session
            .reply(501, "Port number must be 1024 or higher.")
            .await;
    }

    info!("{}: active data connection target {}", session.peer, target);
    session.data_channel = Some(DataChannel::active(target));
    session.reply(200, "PORT command successful.").await
}

/// Parses `h1,h2,h3,h4,p1,p2`.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let numbers: Vec<u8> = arg
        .trim()
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;

    match numbers.as_slice() {
        &[a, b, c, d, high, low] => Some(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
            (u16::from(high) << 8) | u16::from(low),
        )),
        _ => None,
    }
}

/// Parses `<d>proto<d>address<d>port<d>` where `<d>` is any printable
/// delimiter character chosen by the client.
pub fn parse_eprt_argument(arg: &str) -> Result<SocketAddr, EprtError> {
    let arg = arg.trim();
    let delimiter = arg.chars().next().ok_or(EprtError::Syntax)?;
    if !delimiter.is_ascii_graphic() {
        return Err(EprtError::Syntax);
    }

    let fields: Vec<&str> = arg.split(delimiter).collect();
    let (protocol, address, port) = match fields.as_slice() {
        ["", protocol, address, port, ""] => (*protocol, *address, *port),
        _ => return Err(EprtError::Syntax),
    };

    let ip: IpAddr = match protocol {
        "1" => address
            .parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .map_err(|_| EprtError::Syntax)?,
        "2" => address
            .parse::<std::net::Ipv6Addr>()
            .map(IpAddr::V6)
            .map_err(|_| EprtError::Syntax)?,
        _ => return Err(EprtError::UnsupportedProtocol),
    };
    let port: u16 = port.parse().map_err(|_| EprtError::Syntax)?;

    Ok(SocketAddr::new(ip, port))
}
