//! Input mapping
//!
//! Translates raw joystick/UI input events into motion commands. Instead
//! of hardware callbacks poking the socket directly, events arrive over a
//! channel and are mapped here, so a gamepad, a browser joystick widget,
//! and a test all drive the robot through the same path.

use crate::channel::ControlChannel;
use roverlink_core::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Joystick axes the mapper understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Turn axis: -1.0 left, 1.0 right
    X,
    /// Drive axis: -1.0 backward, 1.0 forward
    Y,
}

/// One raw input event from a joystick or UI shell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// An axis moved to a new position in [-1, 1]
    AxisMoved {
        /// Which axis moved
        axis: Axis,
        /// New axis position
        value: f32,
    },
    /// A button was pressed
    ButtonPressed(u8),
    /// A button was released
    ButtonReleased(u8),
}

/// Input mapper configuration
#[derive(Debug, Clone)]
pub struct InputMapperConfig {
    /// Axis magnitudes below this snap to zero
    pub dead_zone: f32,
    /// Dead-man button: motion commands flow only while it is held.
    /// `None` disables the gate entirely.
    pub enable_button: Option<u8>,
}

impl Default for InputMapperConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.15,
            enable_button: None,
        }
    }
}

/// Stateful translation of input events into motion commands.
///
/// Holds the latest joystick vector; every axis move re-emits the full
/// vector as a `move` command, and releasing the dead-man button emits a
/// `stop` so the rover never keeps driving on a stale vector.
#[derive(Debug)]
pub struct InputMapper {
    config: InputMapperConfig,
    x: f32,
    y: f32,
    enabled: bool,
}

impl InputMapper {
    /// Create a mapper; motion starts enabled unless a dead-man button is configured
    pub fn new(config: InputMapperConfig) -> Self {
        let enabled = config.enable_button.is_none();
        Self {
            config,
            x: 0.0,
            y: 0.0,
            enabled,
        }
    }

    /// Latest control vector
    pub fn vector(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Whether motion commands are currently being emitted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn snap(&self, value: f32) -> f32 {
        if value.abs() < self.config.dead_zone {
            0.0
        } else {
            value.clamp(-1.0, 1.0)
        }
    }

    /// Apply one event, returning the command to send, if any
    pub fn apply(&mut self, event: InputEvent) -> Option<Command> {
        match event {
            InputEvent::AxisMoved { axis, value } => {
                let value = self.snap(value);
                match axis {
                    Axis::X => self.x = value,
                    Axis::Y => self.y = value,
                }
                if self.enabled {
                    Some(Command::Move {
                        x: self.x,
                        y: self.y,
                    })
                } else {
                    None
                }
            }
            InputEvent::ButtonPressed(button) => {
                if Some(button) == self.config.enable_button {
                    self.enabled = true;
                    debug!("motion enabled");
                }
                None
            }
            InputEvent::ButtonReleased(button) => {
                if Some(button) == self.config.enable_button && self.enabled {
                    self.enabled = false;
                    debug!("motion disabled, stopping");
                    Some(Command::Stop)
                } else {
                    None
                }
            }
        }
    }

    /// Drain input events from `events`, pushing mapped commands through
    /// the channel. A delivery failure is logged and dropped; the next
    /// event retries, which is the caller-driven retry the channel
    /// expects. Returns when the event sender is dropped.
    pub async fn pump(
        &mut self,
        mut events: mpsc::Receiver<InputEvent>,
        channel: &ControlChannel,
    ) {
        while let Some(event) = events.recv().await {
            if let Some(command) = self.apply(event) {
                if let Err(e) = channel.send_command(&command).await {
                    warn!(command = %command, "delivery failed: {}", e);
                }
            }
        }
        debug!("input event source closed");
    }
}
