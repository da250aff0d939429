use crate::constants::{MAX_NUM_CLIENTS, MIN_NUM_CLIENTS};
use crate::core_jail::JailRoot;
use crate::core_network::error::ServerError;
use crate::session::Session;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;

const TOO_MANY_USERS_REPLY: &[u8] =
    b"421 Too many users logged in, closing control connection.\r\n";

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Settings the connection engine runs with. Built once at startup and
/// shared read-only by every session.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub max_clients: usize,
    pub idle_timeout: Duration,
    pub data_timeout: Duration,
    pub download_buffer_size: usize,
    pub jail: JailRoot,
}

/// Control socket that is bound but not yet accepting.
///
/// Splitting bind from start lets the caller give up privileges in
/// between: the port may be privileged, but no client is served before
/// the jail is in place.
pub struct FtpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: Arc<ServerConfig>,
}

/// Handle to a server whose accept loop is running.
pub struct RunningServer {
    local_addr: SocketAddr,
    max_clients: usize,
    slots: Arc<Semaphore>,
    shutdown: oneshot::Sender<()>,
    accept_loop: JoinHandle<()>,
}

impl FtpListener {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if !(MIN_NUM_CLIENTS..=MAX_NUM_CLIENTS).contains(&config.max_clients) {
            return Err(ServerError::InvalidConfig(format!(
                "max clients must be between {} and {}",
                MIN_NUM_CLIENTS, MAX_NUM_CLIENTS
            )));
        }

        let address = config.listen_address.clone();
        let candidates: Vec<SocketAddr> = lookup_host((address.as_str(), config.listen_port))
            .await
            .map_err(|e| ServerError::Unresolvable(address.clone(), e))?
            .collect();

        let mut last_error = None;
        for addr in candidates {
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    let local_addr = listener.local_addr().map_err(|source| {
                        ServerError::Bind { addr, source }
                    })?;
                    info!("Server listening on {}", local_addr);
                    return Ok(Self {
                        listener,
                        local_addr,
                        config: Arc::new(config),
                    });
                }
                Err(source) => {
                    warn!("Failed to bind {}: {}", addr, source);
                    last_error = Some(ServerError::Bind { addr, source });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ServerError::Unresolvable(
                address,
                io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            )
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the accept loop.
    pub fn start(self) -> RunningServer {
        let max_clients = self.config.max_clients;
        let slots = Arc::new(Semaphore::new(max_clients));
        let (shutdown, shutdown_rx) = oneshot::channel();

        let accept_loop = tokio::spawn(accept_loop(
            self.listener,
            self.config,
            Arc::clone(&slots),
            shutdown_rx,
        ));

        RunningServer {
            local_addr: self.local_addr,
            max_clients,
            slots,
            shutdown,
            accept_loop,
        }
    }
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of sessions currently holding an admission slot.
    pub fn active_sessions(&self) -> usize {
        self.max_clients - self.slots.available_permits()
    }

    /// Stops accepting, then waits until every live session has finished
    /// on its own and given its slot back.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.accept_loop.await {
            error!("Accept loop ended abnormally: {}", e);
        }

        info!(
            "Waiting for {} active session(s) to finish...",
            self.max_clients - self.slots.available_permits()
        );
        // Slots are u32 in tokio; the ceiling is validated far below that.
        let all_slots = u32::try_from(self.max_clients).unwrap_or(u32::MAX);
        if self.slots.acquire_many(all_slots).await.is_err() {
            error!("Admission slots closed while draining sessions");
        }
        info!("All sessions finished.");
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    slots: Arc<Semaphore>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("No longer accepting new connections.");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        let slot = match Arc::clone(&slots).try_acquire_owned() {
            Ok(slot) => slot,
            Err(_) => {
                warn!(
                    "Connection limit of {} reached, rejecting {}",
                    config.max_clients, peer
                );
                reject_connection(stream);
                continue;
            }
        };

        info!(
            "New connection from {} ({}/{} sessions)",
            peer,
            config.max_clients - slots.available_permits(),
            config.max_clients
        );

        let config = Arc::clone(&config);
        tokio::spawn(async move {
            // Held for the whole session; dropping it on any exit path,
            // including a panic, returns the slot exactly once.
            let _slot = slot;
            run_session(stream, peer, config).await;
        });
    }
}

/// Refuses a connection without blocking the accept loop: the reply goes
/// into the fresh socket's empty send buffer or not at all.
fn reject_connection(stream: TcpStream) {
    if let Err(e) = stream.try_write(TOO_MANY_USERS_REPLY) {
        warn!("Could not send rejection reply: {}", e);
    }
}

async fn run_session(stream: TcpStream, peer: SocketAddr, config: Arc<ServerConfig>) {
    let session = match Session::new(stream, config) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to set up session for {}: {}", peer, e);
            return;
        }
    };

    match session.run().await {
        Ok(end) => info!("Session {} ended: {}", peer, end),
        Err(e) => warn!("Session {} terminated: {}", peer, e),
    }
}
