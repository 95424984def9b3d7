//! Whole-robot assembly
//!
//! Wires the injected hardware ports into the two servers and manages
//! their shared shutdown. This is the only place where the command and
//! video sides meet; each remains independently usable.

use roverlink_core::MotorDriver;
use roverlink_server::{CommandRouter, CommandServer, CommandServerError};
use roverlink_video::{
    CaptureConfig, FrameBroadcaster, FrameSource, StreamServer, StreamServerConfig, VideoError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Robot assembly error type
#[derive(Error, Debug)]
pub enum RobotError {
    /// Required builder field was not provided
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Video pipeline failed to come up
    #[error(transparent)]
    Video(#[from] VideoError),

    /// Command endpoint failed to come up
    #[error(transparent)]
    Command(#[from] CommandServerError),
}

/// Addresses and capture settings for a robot process
#[derive(Debug, Clone)]
pub struct RobotConfig {
    /// Bind address of the WebSocket command endpoint
    pub control_addr: SocketAddr,
    /// Bind address of the MJPEG stream server
    pub video_addr: SocketAddr,
    /// Camera capture configuration
    pub capture: CaptureConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            control_addr: ([0, 0, 0, 0], 5000).into(),
            video_addr: ([0, 0, 0, 0], 8000).into(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Builder for a running [`Robot`]
pub struct RobotBuilder {
    driver: Option<Arc<dyn MotorDriver>>,
    source: Option<Arc<dyn FrameSource>>,
    config: RobotConfig,
}

impl RobotBuilder {
    /// Start building a robot with default addresses
    pub fn new() -> Self {
        Self {
            driver: None,
            source: None,
            config: RobotConfig::default(),
        }
    }

    /// Inject the motor driver (required)
    pub fn driver(mut self, driver: Arc<dyn MotorDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Inject the camera frame source (required)
    pub fn frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Bind address for the command endpoint
    pub fn control_addr(mut self, addr: SocketAddr) -> Self {
        self.config.control_addr = addr;
        self
    }

    /// Bind address for the MJPEG stream server
    pub fn video_addr(mut self, addr: SocketAddr) -> Self {
        self.config.video_addr = addr;
        self
    }

    /// Camera capture configuration
    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.config.capture = capture;
        self
    }

    /// Bind both servers and start serving
    pub async fn start(self) -> Result<Robot, RobotError> {
        let driver = self
            .driver
            .ok_or_else(|| RobotError::MissingConfiguration {
                field: "driver".to_string(),
            })?;
        let source = self
            .source
            .ok_or_else(|| RobotError::MissingConfiguration {
                field: "frame_source".to_string(),
            })?;

        let broadcaster = Arc::new(FrameBroadcaster::new(source, self.config.capture)?);
        let router = Arc::new(CommandRouter::new(driver));

        let command_server = CommandServer::bind(self.config.control_addr, router).await?;
        let stream_server = StreamServer::bind(
            StreamServerConfig {
                bind_addr: self.config.video_addr,
            },
            Arc::clone(&broadcaster),
        )
        .await?;

        let control_addr = command_server.local_addr();
        let video_addr = stream_server.local_addr();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn({
            let shutdown_rx = shutdown_rx.clone();
            async move {
                let _ = command_server.run(shutdown_rx).await;
            }
        });
        tokio::spawn(async move {
            let _ = stream_server.run(shutdown_rx).await;
        });

        info!(
            "robot up: control ws://{}/ video http://{}/stream.mjpg",
            control_addr, video_addr
        );

        Ok(Robot {
            control_addr,
            video_addr,
            broadcaster,
            shutdown_tx,
        })
    }
}

impl Default for RobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running robot process: one command endpoint, one stream server
pub struct Robot {
    control_addr: SocketAddr,
    video_addr: SocketAddr,
    broadcaster: Arc<FrameBroadcaster>,
    shutdown_tx: watch::Sender<bool>,
}

impl Robot {
    /// Bound address of the command endpoint
    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    /// Bound address of the MJPEG stream server
    pub fn video_addr(&self) -> SocketAddr {
        self.video_addr
    }

    /// The frame broadcaster, for observability
    pub fn broadcaster(&self) -> &FrameBroadcaster {
        &self.broadcaster
    }

    /// Stop both servers; streaming consumers deregister as they exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        info!("robot shutdown requested");
    }
}
