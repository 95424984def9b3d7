//! Control channel
//!
//! Maintains the client's single logical connection to the robot's
//! command endpoint. At most one connect attempt is ever in flight: a
//! non-blocking gate turns concurrent `connect` callers into immediate
//! "already connecting" results instead of a reconnection storm. A send
//! failure marks the channel idle; the next `send_command` reconnects.

use crate::error::ChannelError;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use roverlink_core::{Command, CommandResponse};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Observable connection state of a [`ControlChannel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No transport; next send triggers a connect
    Idle,
    /// One connect attempt is in flight
    Connecting,
    /// Transport established; commands can be sent
    Connected,
}

/// Control channel configuration
#[derive(Debug, Clone)]
pub struct ControlChannelConfig {
    /// Deadline for a single connect attempt
    pub connect_timeout: Duration,
    /// Deadline for the acknowledgement after a send
    pub ack_timeout: Duration,
}

impl Default for ControlChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            ack_timeout: Duration::from_secs(2),
        }
    }
}

/// Client connection to the robot's command endpoint.
///
/// Send/acknowledge pairs are serialized by an internal mutex, so the
/// channel can be shared between a joystick pump and a UI without
/// interleaving replies.
pub struct ControlChannel {
    url: String,
    config: ControlChannelConfig,
    state: RwLock<ChannelState>,
    socket: Mutex<Option<WsStream>>,
    connect_gate: Mutex<()>,
}

impl ControlChannel {
    /// Create a channel for the given WebSocket URL (e.g. `ws://rover:5000/`)
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, ControlChannelConfig::default())
    }

    /// Create a channel with custom timeouts
    pub fn with_config(url: impl Into<String>, config: ControlChannelConfig) -> Self {
        Self {
            url: url.into(),
            config,
            state: RwLock::new(ChannelState::Idle),
            socket: Mutex::new(None),
            connect_gate: Mutex::new(()),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// Whether the channel currently holds a transport
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    fn set_state(&self, state: ChannelState) {
        *self.state.write() = state;
    }

    /// Establish the connection.
    ///
    /// If another attempt is already in flight, this returns
    /// [`ChannelError::ConnectInProgress`] immediately rather than piling
    /// up a second attempt. Returns `Ok` without touching the transport
    /// when already connected.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let _gate = match self.connect_gate.try_lock() {
            Ok(gate) => gate,
            Err(_) => {
                debug!("connect refused: attempt already in flight");
                return Err(ChannelError::ConnectInProgress {
                    last_state: self.state(),
                });
            }
        };

        if self.state() == ChannelState::Connected {
            return Ok(());
        }
        self.set_state(ChannelState::Connecting);

        match timeout(self.config.connect_timeout, connect_async(&self.url)).await {
            Ok(Ok((ws, _response))) => {
                *self.socket.lock().await = Some(ws);
                self.set_state(ChannelState::Connected);
                info!("connected to {}", self.url);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_state(ChannelState::Idle);
                warn!("connect to {} failed: {}", self.url, e);
                Err(ChannelError::Transport {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                self.set_state(ChannelState::Idle);
                warn!("connect to {} timed out", self.url);
                Err(ChannelError::Timeout {
                    operation: "connect".to_string(),
                    duration: self.config.connect_timeout,
                })
            }
        }
    }

    /// Send one command and wait for its acknowledgement.
    ///
    /// Reconnects first if the channel is idle; a failed connect is
    /// returned as the delivery failure without further retries (the next
    /// input tick retries by calling this again). Only a reply carrying
    /// the success marker counts as delivery; any other reply, a timeout,
    /// or a transport error marks the channel idle.
    pub async fn send_command(&self, command: &Command) -> Result<String, ChannelError> {
        if self.state() != ChannelState::Connected {
            self.connect().await?;
        }

        let mut socket = self.socket.lock().await;
        let ws = socket.as_mut().ok_or_else(|| ChannelError::Transport {
            reason: "not connected".to_string(),
        })?;

        if let Err(e) = ws.send(Message::Text(command.encode())).await {
            drop(socket);
            self.disconnect().await;
            return Err(ChannelError::Transport {
                reason: format!("send failed: {}", e),
            });
        }

        let reply = match timeout(self.config.ack_timeout, next_text(ws)).await {
            Ok(Ok(text)) => text,
            Ok(Err(reason)) => {
                drop(socket);
                self.disconnect().await;
                return Err(ChannelError::Transport { reason });
            }
            Err(_) => {
                drop(socket);
                self.disconnect().await;
                return Err(ChannelError::Timeout {
                    operation: "acknowledge".to_string(),
                    duration: self.config.ack_timeout,
                });
            }
        };

        match CommandResponse::from_wire(&reply) {
            CommandResponse::Ok(echo) => {
                debug!(command = %command, "acknowledged: {}", echo);
                Ok(echo)
            }
            _ => {
                drop(socket);
                self.disconnect().await;
                Err(ChannelError::Nack { response: reply })
            }
        }
    }

    /// Release the transport and reset to idle. Safe in any state.
    pub async fn close(&self) {
        let mut socket = self.socket.lock().await;
        if let Some(mut ws) = socket.take() {
            let _ = ws.close(None).await;
            info!("closed connection to {}", self.url);
        }
        self.set_state(ChannelState::Idle);
    }

    /// Drop the transport after a failure; next send reconnects
    async fn disconnect(&self) {
        self.socket.lock().await.take();
        self.set_state(ChannelState::Idle);
    }
}

/// Read frames until the next text message; control frames are skipped
async fn next_text(ws: &mut WsStream) -> Result<String, String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Close(_))) => return Err("connection closed by peer".to_string()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.to_string()),
            None => return Err("connection stream ended".to_string()),
        }
    }
}
