//! # Roverlink - Remote Drive and Live Video for a Wheeled Robot
//!
//! Roverlink turns a differential-drive chassis with a camera into a
//! remotely driven robot: a WebSocket command endpoint converts joystick
//! vectors into per-wheel motor speeds while an MJPEG server streams the
//! live camera feed to any number of viewers.
//!
//! ## Key Properties
//!
//! - **Latest frame wins**: one capture producer, unbounded independent
//!   viewers, no frame queue to grow behind a slow client
//! - **Lazy camera lifecycle**: the first viewer powers the camera up,
//!   the last one out powers it down
//! - **Storm-free reconnect**: the control client keeps at most one
//!   connect attempt in flight, however lossy the link
//! - **Injected hardware**: motor driver and camera are constructor
//!   arguments, never ambient globals
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roverlink::{RobotBuilder, TestPatternSource};
//! use roverlink_core::RecordingMotorDriver;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let robot = RobotBuilder::new()
//!         .driver(Arc::new(RecordingMotorDriver::new()))
//!         .frame_source(TestPatternSource::new())
//!         .start()
//!         .await?;
//!
//!     println!("control: ws://{}/", robot.control_addr());
//!     println!("video:   http://{}/stream.mjpg", robot.video_addr());
//!
//!     tokio::signal::ctrl_c().await?;
//!     robot.shutdown().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use roverlink_core::{
    apply_wheel_speeds, compute_wheel_speeds, Command, CommandResponse, MotorDriver, MotorId,
    ReversedPolarity, RoverError, WheelSpeeds,
};

pub use roverlink_video::{
    BroadcastStats, CaptureConfig, Frame, FrameBroadcaster, FrameSource, StreamServer,
    StreamServerConfig, TestPatternSource, VideoError,
};

pub use roverlink_control::{
    Axis, ChannelError, ChannelState, ControlChannel, ControlChannelConfig, InputEvent,
    InputMapper, InputMapperConfig,
};

pub use roverlink_server::{CommandRouter, CommandServer, CommandServerError};

// Public API modules
pub mod robot;

// Re-export main API types
pub use robot::{Robot, RobotBuilder, RobotConfig, RobotError};
