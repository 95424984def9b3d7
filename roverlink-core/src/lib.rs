//! # Roverlink Core
//!
//! Command protocol, differential-drive kinematics, and hardware port
//! abstractions shared by the roverlink robot server and control client.
//! This crate is transport-free: it defines what a command *is* and how it
//! maps onto wheel speeds, not how it travels over the network.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod kinematics;
pub mod motor;

// Re-export main types
pub use command::{Command, CommandResponse, MARKER_ERR, MARKER_NOACTION, MARKER_OK};
pub use error::RoverError;
pub use kinematics::{compute_wheel_speeds, WheelSpeeds};
pub use motor::{apply_wheel_speeds, MotorDriver, MotorId, RecordingMotorDriver, ReversedPolarity};
