use crate::core_network::error::DataChannelError;
use log::{debug, warn};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Pending data connection, set up by PASV/EPSV or PORT/EPRT and consumed
/// by the next transfer command.
#[derive(Debug)]
pub enum DataChannel {
    /// Listening socket waiting for the client to connect.
    Passive(TcpListener),
    /// Address the server connects out to.
    Active(SocketAddr),
}

impl DataChannel {
    /// Binds an ephemeral listening socket on `ip`.
    pub async fn passive(ip: IpAddr) -> io::Result<(Self, SocketAddr)> {
        let listener = TcpListener::bind((ip, 0)).await?;
        let addr = listener.local_addr()?;
        debug!("Passive listener bound on {}", addr);
        Ok((DataChannel::Passive(listener), addr))
    }

    pub fn active(target: SocketAddr) -> Self {
        DataChannel::Active(target)
    }

    /// Turns the pending channel into a connected stream, waiting at most
    /// `wait`. A passive channel accepts exactly one connection and only
    /// from `expected_peer`; the listening socket is dropped either way.
    pub async fn establish(
        self,
        expected_peer: IpAddr,
        wait: Duration,
    ) -> Result<TcpStream, DataChannelError> {
        match self {
            DataChannel::Passive(listener) => {
                let (stream, addr) = timeout(wait, listener.accept())
                    .await
                    .map_err(|_| DataChannelError::AcceptTimeout(wait))??;

                if addr.ip().to_canonical() != expected_peer.to_canonical() {
                    warn!(
                        "Refused passive data connection from {} (control peer is {})",
                        addr, expected_peer
                    );
                    return Err(DataChannelError::UnexpectedPeer(addr));
                }

                debug!("Accepted data connection from {}", addr);
                Ok(stream)
            }
            DataChannel::Active(target) => {
                let stream = timeout(wait, TcpStream::connect(target))
                    .await
                    .map_err(|_| {
                        DataChannelError::ConnectFailed(
                            target,
                            io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                        )
                    })?
                    .map_err(|e| DataChannelError::ConnectFailed(target, e))?;

                debug!("Connected data channel to {}", target);
                Ok(stream)
            }
        }
    }
}
