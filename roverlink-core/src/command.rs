//! Command wire protocol
//!
//! One fixed wire format for motion commands: JSON text messages with a
//! `kind` tag, sent over the control WebSocket. Responses are plain text
//! with a fixed prefix marker so a client can classify them without a JSON
//! parser on the hot path.

use crate::error::RoverError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every successful command response
pub const MARKER_OK: &str = "OK:";

/// Prefix of a response reporting a motor driver failure
pub const MARKER_ERR: &str = "ERR:";

/// Prefix of a response to a malformed or unrecognized payload
pub const MARKER_NOACTION: &str = "NOACTION:";

/// A motion command as it travels over the wire.
///
/// Numeric payloads are clamped into their documented ranges during
/// [`Command::parse`], so downstream consumers never see out-of-range
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Joystick vector: `x` is the turn axis, `y` the drive axis, both in [-1, 1]
    Move {
        /// Turn axis, -1.0 (left) to 1.0 (right)
        x: f32,
        /// Drive axis, -1.0 (backward) to 1.0 (forward)
        y: f32,
    },
    /// Direct per-wheel override
    Motor {
        /// Wire name of the motor (`front_left`, `front_right`, `rear_left`, `rear_right`)
        motor: String,
        /// Signed speed percentage in [-100, 100]
        percent: f32,
    },
    /// Stop all motors; equivalent to `move(0, 0)`
    Stop,
}

impl Command {
    /// Parse a wire payload into a command, clamping numeric fields.
    pub fn parse(text: &str) -> Result<Self, RoverError> {
        let command: Command =
            serde_json::from_str(text).map_err(|e| RoverError::Protocol {
                reason: format!("invalid command payload: {}", e),
            })?;
        Ok(command.clamped())
    }

    /// Encode the command for transmission
    pub fn encode(&self) -> String {
        // Command serialization cannot fail: no maps, no non-string keys.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Copy of the command with every numeric payload clamped into range
    pub fn clamped(&self) -> Self {
        match *self {
            Command::Move { x, y } => Command::Move {
                x: x.clamp(-1.0, 1.0),
                y: y.clamp(-1.0, 1.0),
            },
            Command::Motor { ref motor, percent } => Command::Motor {
                motor: motor.clone(),
                percent: percent.clamp(-100.0, 100.0),
            },
            Command::Stop => Command::Stop,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { x, y } => write!(f, "move x={:.2} y={:.2}", x, y),
            Command::Motor { motor, percent } => {
                write!(f, "motor {} percent={:.1}", motor, percent)
            }
            Command::Stop => write!(f, "stop"),
        }
    }
}

/// Classified response to a single command.
///
/// Every request receives exactly one response; unrecognized input is
/// answered with an explicit no-action rather than silence.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    /// Command executed; carries a human-readable echo of what ran
    Ok(String),
    /// Motor driver rejected the command; later commands still process
    HardwareError(String),
    /// Payload was malformed or unrecognized; nothing was actuated
    NoAction(String),
}

impl CommandResponse {
    /// Render the response for transmission
    pub fn to_wire(&self) -> String {
        match self {
            CommandResponse::Ok(echo) => format!("{}{}", MARKER_OK, echo),
            CommandResponse::HardwareError(detail) => format!("{}{}", MARKER_ERR, detail),
            CommandResponse::NoAction(detail) => format!("{}{}", MARKER_NOACTION, detail),
        }
    }

    /// Classify a received response line by its marker.
    ///
    /// A line with no recognized marker is treated as no-action; the
    /// control channel only considers [`CommandResponse::Ok`] a delivery
    /// success.
    pub fn from_wire(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix(MARKER_OK) {
            CommandResponse::Ok(rest.to_string())
        } else if let Some(rest) = line.strip_prefix(MARKER_ERR) {
            CommandResponse::HardwareError(rest.to_string())
        } else if let Some(rest) = line.strip_prefix(MARKER_NOACTION) {
            CommandResponse::NoAction(rest.to_string())
        } else {
            CommandResponse::NoAction(line.to_string())
        }
    }

    /// Whether this response acknowledges successful execution
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandResponse::Ok(_))
    }
}
