//! # Roverlink Control
//!
//! Client side of the rover's command channel: a single reconnecting
//! WebSocket connection that serializes command send/acknowledge pairs,
//! plus the mapping from raw joystick/UI input events onto motion
//! commands. Joystick and UI control both funnel through the same
//! [`ControlChannel`], so the robot sees one kind of client.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod input;

// Re-export main types
pub use channel::{ChannelState, ControlChannel, ControlChannelConfig};
pub use error::ChannelError;
pub use input::{Axis, InputEvent, InputMapper, InputMapperConfig};
