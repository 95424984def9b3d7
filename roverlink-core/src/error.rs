//! Error types shared across the roverlink crates

use thiserror::Error;

/// Main error type for command handling and motor control
#[derive(Error, Debug)]
pub enum RoverError {
    /// Malformed or unrecognized command payload
    #[error("Protocol error: {reason}")]
    Protocol {
        /// Reason the payload was rejected
        reason: String,
    },

    /// Motor driver rejected a command
    #[error("Hardware error on {motor}: {reason}")]
    Hardware {
        /// Motor the command was addressed to
        motor: String,
        /// Reason reported by the driver
        reason: String,
    },

}

impl RoverError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            RoverError::Protocol { .. } => "PROTOCOL_ERROR".to_string(),
            RoverError::Hardware { .. } => "HARDWARE_ERROR".to_string(),
        }
    }
}
