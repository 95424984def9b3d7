//! Command server
//!
//! WebSocket endpoint terminating control clients. Each connection runs
//! on its own task: text messages go through the [`CommandRouter`] and
//! the single response line is sent back. When a connection ends for any
//! reason the server issues an all-stop, so a vanished client never
//! leaves the rover driving.

use crate::router::CommandRouter;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Command server error type
#[derive(Error, Debug)]
pub enum CommandServerError {
    /// Listener failed to bind
    #[error("Failed to start command server on {address}: {source}")]
    ServerStart {
        /// Address that failed to bind
        address: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error
        #[from]
        source: std::io::Error,
    },
}

/// WebSocket endpoint dispatching motion commands to the router
pub struct CommandServer {
    listener: TcpListener,
    router: Arc<CommandRouter>,
    connections: Arc<DashMap<Uuid, SocketAddr>>,
    local_addr: SocketAddr,
}

impl CommandServer {
    /// Bind the listener; the accept loop starts in [`CommandServer::run`]
    pub async fn bind(
        bind_addr: SocketAddr,
        router: Arc<CommandRouter>,
    ) -> Result<Self, CommandServerError> {
        let listener =
            TcpListener::bind(bind_addr)
                .await
                .map_err(|e| CommandServerError::ServerStart {
                    address: bind_addr,
                    source: e,
                })?;
        let local_addr = listener.local_addr()?;
        info!("command server listening on {}", local_addr);
        Ok(Self {
            listener,
            router,
            connections: Arc::new(DashMap::new()),
            local_addr,
        })
    }

    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected control clients
    pub fn active_clients(&self) -> usize {
        self.connections.len()
    }

    /// Registry handle for observing clients while `run` owns the server
    pub fn connections(&self) -> Arc<DashMap<Uuid, SocketAddr>> {
        Arc::clone(&self.connections)
    }

    /// Accept control connections until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), CommandServerError> {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("command server shutting down");
                        return Ok(());
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("new control connection from {}", addr);
                            let router = Arc::clone(&self.router);
                            let connections = Arc::clone(&self.connections);
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                handle_connection(router, connections, stream, addr, shutdown)
                                    .await;
                            });
                        }
                        Err(e) => {
                            warn!("failed to accept control connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// Serve one control client until it disconnects or the server shuts
/// down, then stop the rover
async fn handle_connection(
    router: Arc<CommandRouter>,
    connections: Arc<DashMap<Uuid, SocketAddr>>,
    stream: TcpStream,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    connections.insert(connection_id, addr);
    info!(connection = %connection_id, "control client connected from {}", addr);

    loop {
        let message = tokio::select! {
            message = ws.next() => message,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(connection = %connection_id, "closing connection on server shutdown");
                    let _ = ws.close(None).await;
                    break;
                }
                continue;
            }
        };
        match message {
            Some(Ok(Message::Text(text))) => {
                let response = router.route(&text).await;
                if let Err(e) = ws.send(Message::Text(response)).await {
                    warn!(connection = %connection_id, "failed to send response: {}", e);
                    break;
                }
            }
            Some(Ok(Message::Close(_))) => {
                debug!(connection = %connection_id, "client closed the connection");
                break;
            }
            Some(Ok(_)) => {
                // Binary, Ping, Pong: nothing to route
            }
            Some(Err(e)) => {
                warn!(connection = %connection_id, "connection error: {}", e);
                break;
            }
            None => {
                debug!(connection = %connection_id, "connection stream ended");
                break;
            }
        }
    }

    connections.remove(&connection_id);

    // Dead-man behavior: whatever ended this connection, the rover stops.
    if let Err(e) = router.stop_all().await {
        warn!(connection = %connection_id, "failed to stop motors on disconnect: {}", e);
    }
    info!(connection = %connection_id, "control client disconnected");
}
